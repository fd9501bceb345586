//! Record-to-table mapping via static field descriptors.
//!
//! A type becomes persistable by implementing [`Model`]: a table name plus a
//! static table of [`FieldDef`] descriptors, each pairing a column name with
//! getter/setter functions. SQL generated here backtick-quotes identifiers;
//! the ad-hoc builder layer leaves them verbatim.

use mysql_async::Value;

use crate::condition::{Condition, Op, Where};
use crate::error::{OrmError, OrmResult};
use crate::row::{FromRow, RowMap};

/// Static descriptor binding one column to one field of a record type.
pub struct FieldDef<M> {
    /// Column name, without quoting.
    pub column: &'static str,
    /// Required fields are always written, even when their value is `NULL`.
    pub required: bool,
    /// Primary fields form the WHERE clause of update/delete by record.
    pub primary: bool,
    /// Read the field as a driver value.
    pub get: fn(&M) -> Value,
    /// Write a driver value back into the field.
    pub set: fn(&mut M, Value) -> OrmResult<()>,
}

/// A persistable record type.
///
/// Hooks run before SQL generation: `before_save` plus `before_create` for
/// inserts, `before_save` plus `before_update` for updates. Defaults do
/// nothing.
pub trait Model: Default + Send + Sync + Sized {
    /// Table name, without quoting.
    const TABLE: &'static str;

    /// The field descriptor table. Order fixes generated column order.
    fn fields() -> &'static [FieldDef<Self>];

    fn before_save(&mut self) {}
    fn before_create(&mut self) {}
    fn before_update(&mut self) {}
}

fn quoted(ident: &str) -> String {
    format!("`{ident}`")
}

/// Whether this field participates in a write for the given record state.
/// Optional fields holding `NULL` are left to the column default.
fn writable<M: Model>(def: &FieldDef<M>, value: &Value) -> bool {
    def.required || !matches!(value, Value::NULL)
}

/// Render a multi-row insert for `models`, running create hooks on each.
///
/// The first record fixes the column list: its writable fields, in descriptor
/// order. Later records contribute their values for those same columns.
pub fn insert_models_sql<M: Model + 'static>(args: &mut Vec<Value>, models: &mut [M]) -> OrmResult<String> {
    if models.is_empty() {
        return Err(OrmError::Other(format!(
            "insert into {}: no records",
            M::TABLE
        )));
    }
    for model in models.iter_mut() {
        model.before_save();
        model.before_create();
    }

    let defs: Vec<&FieldDef<M>> = M::fields()
        .iter()
        .filter(|def| writable(def, &(def.get)(&models[0])))
        .collect();
    if defs.is_empty() {
        return Err(OrmError::NoMappableField(M::TABLE.to_string()));
    }

    let columns: Vec<String> = defs.iter().map(|def| quoted(def.column)).collect();
    let mut buf = format!(
        "INSERT INTO {}({})VALUES",
        quoted(M::TABLE),
        columns.join(",")
    );
    for (index, model) in models.iter().enumerate() {
        if index > 0 {
            buf.push(',');
        }
        buf.push('(');
        for (pos, def) in defs.iter().enumerate() {
            if pos > 0 {
                buf.push(',');
            }
            buf.push('?');
            args.push((def.get)(model));
        }
        buf.push(')');
    }
    Ok(buf)
}

/// Render an update keyed by the record's primary fields, running update
/// hooks first. Non-primary optional fields holding `NULL` are skipped.
pub fn update_model_sql<M: Model + 'static>(args: &mut Vec<Value>, model: &mut M) -> OrmResult<String> {
    model.before_save();
    model.before_update();

    let mut buf = format!("UPDATE {} SET ", quoted(M::TABLE));
    let mut set_count = 0;
    for def in M::fields().iter().filter(|def| !def.primary) {
        let value = (def.get)(model);
        if !writable(def, &value) {
            continue;
        }
        if set_count > 0 {
            buf.push(',');
        }
        buf.push_str(&quoted(def.column));
        buf.push_str("=?");
        args.push(value);
        set_count += 1;
    }
    if set_count == 0 {
        return Err(OrmError::NoMappableField(M::TABLE.to_string()));
    }

    buf.push_str(&primary_where(model)?.sql(args));
    Ok(buf)
}

/// Render a delete keyed by the record's primary fields.
pub fn delete_model_sql<M: Model + 'static>(args: &mut Vec<Value>, model: &M) -> OrmResult<String> {
    let mut buf = format!("DELETE FROM {}", quoted(M::TABLE));
    buf.push_str(&primary_where(model)?.sql(args));
    Ok(buf)
}

/// Render a single-row select over the model's table with the given
/// condition, forcing ` LIMIT 1`.
pub fn find_one_model_sql<M: Model>(args: &mut Vec<Value>, condition: Condition) -> String {
    let mut buf = format!("SELECT * FROM {}", quoted(M::TABLE));
    buf.push_str(&Where::new(condition).sql(args));
    buf.push_str(" LIMIT 1");
    buf
}

/// Build a WHERE chain equating every primary field to its current value.
fn primary_where<M: Model + 'static>(model: &M) -> OrmResult<Where> {
    let mut condition = Condition::all();
    let mut found = false;
    for def in M::fields().iter().filter(|def| def.primary) {
        condition = condition.field(quoted(def.column), Op::Eq((def.get)(model)));
        found = true;
    }
    if !found {
        return Err(OrmError::NoPrimaryKey(M::TABLE.to_string()));
    }
    Ok(Where::new(condition))
}

/// Every model hydrates from a row by applying its setters to the matching
/// columns. Columns absent from the result set leave the default value.
impl<M: Model + 'static> FromRow for M {
    fn from_row(row: &RowMap) -> OrmResult<Self> {
        let mut model = M::default();
        for def in M::fields() {
            if let Some(value) = row.value(def.column) {
                (def.set)(&mut model, value.clone())?;
            }
        }
        Ok(model)
    }
}
