//! Decoded result rows.

use mysql_async::prelude::FromValue;
use mysql_async::{Value, from_value_opt};

use crate::error::{OrmError, OrmResult};

/// One decoded result row: ordered column names paired with raw values.
///
/// Columns keep the order the server returned them in.
#[derive(Clone, Debug, Default)]
pub struct RowMap {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl RowMap {
    /// Decode a driver row. Values the driver has already consumed come back
    /// as `NULL`.
    pub fn from_driver_row(mut row: mysql_async::Row) -> Self {
        let columns: Vec<String> = row
            .columns_ref()
            .iter()
            .map(|col| col.name_str().into_owned())
            .collect();
        let values = (0..columns.len())
            .map(|i| row.take::<Value, _>(i).unwrap_or(Value::NULL))
            .collect();
        RowMap { columns, values }
    }

    /// Build a row from explicit pairs.
    pub fn from_pairs(pairs: Vec<(String, Value)>) -> Self {
        let (columns, values) = pairs.into_iter().unzip();
        RowMap { columns, values }
    }

    /// Column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The raw value of a column, if present.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|name| name == column)
            .map(|i| &self.values[i])
    }

    /// Convert a column's value to `T`.
    ///
    /// Missing columns and failed conversions both surface as
    /// [`OrmError::Decode`].
    pub fn get<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self
            .value(column)
            .ok_or_else(|| OrmError::decode(column, "column not in result set"))?;
        from_value_opt::<T>(value.clone())
            .map_err(|e| OrmError::decode(column, e.to_string()))
    }

    /// Iterate over `(column, value)` pairs in result order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Types that hydrate from a decoded row.
pub trait FromRow: Sized {
    fn from_row(row: &RowMap) -> OrmResult<Self>;
}
