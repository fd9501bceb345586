//! Plain write-statement helpers over ad-hoc [`Row`] assignments.
//!
//! These produce INSERT/UPDATE/DELETE text for callers working with loose
//! column/value pairs rather than a [`crate::Model`]. Identifiers are taken
//! verbatim; the model layer is the one that backtick-quotes.

use mysql_async::Value;

use crate::condition::Where;
use crate::error::{OrmError, OrmResult};

/// An insertion-ordered list of column assignments.
///
/// Used as one row of a multi-row INSERT or as the SET list of an UPDATE.
/// Order is preserved so generated SQL and argument order are deterministic.
#[derive(Clone, Debug, Default)]
pub struct Row {
    entries: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a column. Repeated assignments to the same column each render;
    /// callers are expected to set a column once.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((column.into(), value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The assignments in insertion order.
    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    /// Look up a column's assigned value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

/// Render a multi-row `INSERT INTO t(a,b)VALUES(?,?),(?,?)` statement.
///
/// The first row fixes the column list and order; later rows contribute
/// values in that order, with missing columns filled by `NULL`.
pub fn insert_sql(args: &mut Vec<Value>, table: &str, rows: &[Row]) -> OrmResult<String> {
    let first = rows
        .first()
        .ok_or_else(|| OrmError::Other(format!("insert into {table}: no rows")))?;
    if first.is_empty() {
        return Err(OrmError::NoMappableField(table.to_string()));
    }

    let columns: Vec<&str> = first
        .entries()
        .iter()
        .map(|(name, _)| name.as_str())
        .collect();

    let mut buf = format!("INSERT INTO {table}({})VALUES", columns.join(","));
    for (index, row) in rows.iter().enumerate() {
        if index > 0 {
            buf.push(',');
        }
        buf.push('(');
        for (pos, column) in columns.iter().enumerate() {
            if pos > 0 {
                buf.push(',');
            }
            buf.push('?');
            args.push(row.get(column).cloned().unwrap_or(Value::NULL));
        }
        buf.push(')');
    }
    Ok(buf)
}

/// Render `UPDATE t SET a=?,b=?` followed by the WHERE chain.
pub fn update_sql(
    args: &mut Vec<Value>,
    table: &str,
    set: &Row,
    where_: &Where,
) -> OrmResult<String> {
    if set.is_empty() {
        return Err(OrmError::NoMappableField(table.to_string()));
    }

    let mut buf = format!("UPDATE {table} SET ");
    for (index, (column, value)) in set.entries().iter().enumerate() {
        if index > 0 {
            buf.push(',');
        }
        buf.push_str(column);
        buf.push_str("=?");
        args.push(value.clone());
    }
    buf.push_str(&where_.sql(args));
    Ok(buf)
}

/// Render `DELETE FROM t` followed by the WHERE chain.
pub fn delete_sql(args: &mut Vec<Value>, table: &str, where_: &Where) -> String {
    let mut buf = format!("DELETE FROM {table}");
    buf.push_str(&where_.sql(args));
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Condition, Op, Where};

    #[test]
    fn single_row_insert() {
        let mut args = Vec::new();
        let row = Row::new().set("name", "bob").set("age", 30);
        let sql = insert_sql(&mut args, "user", &[row]).unwrap();
        assert_eq!(sql, "INSERT INTO user(name,age)VALUES(?,?)");
        assert_eq!(args, vec![Value::from("bob"), Value::from(30)]);
    }

    #[test]
    fn multi_row_insert_follows_first_row_order() {
        let mut args = Vec::new();
        let rows = vec![
            Row::new().set("a", 1).set("b", 2),
            Row::new().set("b", 4).set("a", 3),
        ];
        let sql = insert_sql(&mut args, "t", &rows).unwrap();
        assert_eq!(sql, "INSERT INTO t(a,b)VALUES(?,?),(?,?)");
        assert_eq!(
            args,
            vec![
                Value::from(1),
                Value::from(2),
                Value::from(3),
                Value::from(4)
            ]
        );
    }

    #[test]
    fn missing_column_in_later_row_becomes_null() {
        let mut args = Vec::new();
        let rows = vec![Row::new().set("a", 1).set("b", 2), Row::new().set("a", 3)];
        insert_sql(&mut args, "t", &rows).unwrap();
        assert_eq!(args[3], Value::NULL);
    }

    #[test]
    fn insert_rejects_empty_first_row() {
        let mut args = Vec::new();
        let err = insert_sql(&mut args, "t", &[Row::new()]).unwrap_err();
        assert!(matches!(err, OrmError::NoMappableField(_)));
    }

    #[test]
    fn update_with_where() {
        let mut args = Vec::new();
        let set = Row::new().set("name", "bob").set("age", 31);
        let where_ = Where::new(Condition::all().field("id", Op::eq(7)));
        let sql = update_sql(&mut args, "user", &set, &where_).unwrap();
        assert_eq!(sql, "UPDATE user SET name=?,age=? WHERE (id = ?)");
        assert_eq!(args.len(), 3);
        assert_eq!(args[2], Value::from(7));
    }

    #[test]
    fn delete_with_empty_where_renders_bare_delete() {
        let mut args = Vec::new();
        let sql = delete_sql(&mut args, "user", &Where::default());
        assert_eq!(sql, "DELETE FROM user");
        assert!(args.is_empty());
    }
}
