//! Pooled SELECT builder.
//!
//! Builders are recycled through a process-wide free list: [`QueryBuilder::acquire`]
//! hands out a reset builder (reusing a previously released one when available)
//! and [`QueryBuilder::release`] returns it after wiping every field back to the
//! construction default. Allocations inside the builder survive the round trip.

use std::sync::Mutex;

use mysql_async::Value;

use crate::condition::{Condition, Where};

static FREE_LIST: Mutex<Vec<QueryBuilder>> = Mutex::new(Vec::new());

/// Fluent SELECT statement builder.
///
/// Renders `SELECT <cols> FROM <table><where><group><having><order>[ LIMIT o,l]`
/// with `?` placeholders. No identifier quoting is performed; callers supply
/// literal column and table references.
///
/// # Example
/// ```ignore
/// let qb = QueryBuilder::acquire()
///     .select(&["id", "name"])
///     .from("user")
///     .and_where(Condition::all().field("status", Op::eq(1)))
///     .order_by(&["id DESC"])
///     .limit(10);
/// let mut args = Vec::new();
/// let sql = qb.sql(&mut args);
/// QueryBuilder::release(qb);
/// ```
#[derive(Debug, Default)]
pub struct QueryBuilder {
    table: String,
    columns: String,
    where_: Where,
    group: String,
    having: String,
    order: String,
    offset: i64,
    limit: i64,
}

impl QueryBuilder {
    /// Create a fresh builder without touching the free list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a builder from the free list, or create one when the list is
    /// empty. The returned builder is always in the reset state.
    pub fn acquire() -> Self {
        let mut list = FREE_LIST.lock().unwrap_or_else(|e| e.into_inner());
        list.pop().unwrap_or_default()
    }

    /// Reset and return a builder to the free list for reuse.
    pub fn release(mut qb: Self) {
        qb.reset();
        let mut list = FREE_LIST.lock().unwrap_or_else(|e| e.into_inner());
        list.push(qb);
    }

    /// Wipe every field back to the construction default, keeping
    /// allocations.
    pub fn reset(&mut self) {
        self.table.clear();
        self.columns.clear();
        self.where_.clear();
        self.group.clear();
        self.having.clear();
        self.order.clear();
        self.offset = 0;
        self.limit = 0;
    }

    /// Set the projected columns. Replaces any previous selection.
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.join(",");
        self
    }

    /// Set the table to select from.
    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Replace the WHERE chain with this single condition.
    pub fn where_(mut self, condition: Condition) -> Self {
        self.where_ = Where::new(condition);
        self
    }

    /// Append a condition joined with AND.
    pub fn and_where(mut self, condition: Condition) -> Self {
        self.where_ = self.where_.and(condition);
        self
    }

    /// Append a condition joined with OR.
    pub fn or_where(mut self, condition: Condition) -> Self {
        self.where_ = self.where_.or(condition);
        self
    }

    /// Replace the whole WHERE chain.
    pub fn with_where(mut self, where_: Where) -> Self {
        self.where_ = where_;
        self
    }

    /// Set the GROUP BY columns.
    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.group = format!(" GROUP BY {}", columns.join(","));
        self
    }

    /// Set the HAVING expression.
    pub fn having(mut self, expr: &str) -> Self {
        self.having = format!(" HAVING {expr}");
        self
    }

    /// Set the ORDER BY terms (each may carry ASC/DESC).
    pub fn order_by(mut self, terms: &[&str]) -> Self {
        self.order = format!(" ORDER BY {}", terms.join(","));
        self
    }

    /// Set the row offset. Only takes effect together with a positive limit.
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// Set the row limit. Zero omits the LIMIT clause entirely.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// The table this builder selects from.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Render the statement, appending positional arguments to `args`.
    pub fn sql(&self, args: &mut Vec<Value>) -> String {
        let columns = if self.columns.is_empty() {
            "*"
        } else {
            self.columns.as_str()
        };

        let mut buf = format!("SELECT {columns} FROM {}", self.table);
        buf.push_str(&self.where_.sql(args));
        buf.push_str(&self.group);
        buf.push_str(&self.having);
        buf.push_str(&self.order);
        if self.limit > 0 {
            buf.push_str(&format!(" LIMIT {},{}", self.offset, self.limit));
        }
        buf
    }
}
