//! Condition and WHERE-chain primitives for dynamic queries.
//!
//! A [`Condition`] is one renderable WHERE fragment: a set of field
//! comparisons joined by the condition's own boolean operator and wrapped in
//! parentheses. A [`Where`] is an ordered chain of conditions joined by
//! explicit per-link combinators.

use mysql_async::Value;

/// Boolean combinator joining condition fields or chained conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    /// SQL token for this combinator.
    pub fn as_str(self) -> &'static str {
        match self {
            BoolOp::And => "AND",
            BoolOp::Or => "OR",
        }
    }
}

/// Comparison operator for a single field.
///
/// # Example
/// ```ignore
/// use myorm::{Condition, Op};
///
/// Condition::all()
///     .field("status", Op::eq(1))
///     .field("id", Op::in_list(vec![1, 2, 3]))
///     .field("age", Op::between(10, 20));
/// ```
#[derive(Clone, Debug)]
pub enum Op {
    /// Equal: field = ?
    Eq(Value),
    /// Not equal: field != ?
    Ne(Value),
    /// Greater than: field > ?
    Gt(Value),
    /// Greater than or equal: field >= ?
    Gte(Value),
    /// Less than: field < ?
    Lt(Value),
    /// Less than or equal: field <= ?
    Lte(Value),
    /// LIKE pattern match
    Like(Value),
    /// NOT LIKE pattern match
    NotLike(Value),
    /// IN (list); an empty list renders nothing (the field is skipped)
    In(Vec<Value>),
    /// NOT IN (list); an empty list renders nothing
    NotIn(Vec<Value>),
    /// BETWEEN a AND b, consuming exactly two values
    Between(Value, Value),
    /// NOT BETWEEN a AND b
    NotBetween(Value, Value),
    /// IS NULL
    IsNull,
    /// IS NOT NULL
    IsNotNull,
}

impl Op {
    /// Create an equality condition.
    pub fn eq(val: impl Into<Value>) -> Self {
        Op::Eq(val.into())
    }

    /// Create a not-equal condition.
    pub fn ne(val: impl Into<Value>) -> Self {
        Op::Ne(val.into())
    }

    /// Create a greater-than condition.
    pub fn gt(val: impl Into<Value>) -> Self {
        Op::Gt(val.into())
    }

    /// Create a greater-than-or-equal condition.
    pub fn gte(val: impl Into<Value>) -> Self {
        Op::Gte(val.into())
    }

    /// Create a less-than condition.
    pub fn lt(val: impl Into<Value>) -> Self {
        Op::Lt(val.into())
    }

    /// Create a less-than-or-equal condition.
    pub fn lte(val: impl Into<Value>) -> Self {
        Op::Lte(val.into())
    }

    /// Create a LIKE pattern match condition.
    pub fn like(pattern: impl Into<Value>) -> Self {
        Op::Like(pattern.into())
    }

    /// Create a NOT LIKE pattern match condition.
    pub fn not_like(pattern: impl Into<Value>) -> Self {
        Op::NotLike(pattern.into())
    }

    /// Create an IN (list) condition.
    pub fn in_list<T: Into<Value>>(vals: Vec<T>) -> Self {
        Op::In(vals.into_iter().map(Into::into).collect())
    }

    /// Create a NOT IN (list) condition.
    pub fn not_in<T: Into<Value>>(vals: Vec<T>) -> Self {
        Op::NotIn(vals.into_iter().map(Into::into).collect())
    }

    /// Create a BETWEEN condition.
    pub fn between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Op::Between(from.into(), to.into())
    }

    /// Create a NOT BETWEEN condition.
    pub fn not_between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Op::NotBetween(from.into(), to.into())
    }

    /// Whether this operator renders nothing (empty list operations).
    fn is_empty(&self) -> bool {
        matches!(self, Op::In(vals) | Op::NotIn(vals) if vals.is_empty())
    }

    /// Render `field <op> ...` into `buf`, appending positional arguments.
    fn render(&self, field: &str, buf: &mut String, args: &mut Vec<Value>) {
        buf.push_str(field);
        match self {
            Op::Eq(v) => Self::render_cmp(buf, args, "=", v),
            Op::Ne(v) => Self::render_cmp(buf, args, "!=", v),
            Op::Gt(v) => Self::render_cmp(buf, args, ">", v),
            Op::Gte(v) => Self::render_cmp(buf, args, ">=", v),
            Op::Lt(v) => Self::render_cmp(buf, args, "<", v),
            Op::Lte(v) => Self::render_cmp(buf, args, "<=", v),
            Op::Like(v) => Self::render_cmp(buf, args, "LIKE", v),
            Op::NotLike(v) => Self::render_cmp(buf, args, "NOT LIKE", v),
            Op::In(vals) => Self::render_list(buf, args, "IN", vals),
            Op::NotIn(vals) => Self::render_list(buf, args, "NOT IN", vals),
            Op::Between(from, to) => {
                buf.push_str(" BETWEEN ? AND ?");
                args.push(from.clone());
                args.push(to.clone());
            }
            Op::NotBetween(from, to) => {
                buf.push_str(" NOT BETWEEN ? AND ?");
                args.push(from.clone());
                args.push(to.clone());
            }
            Op::IsNull => buf.push_str(" IS NULL"),
            Op::IsNotNull => buf.push_str(" IS NOT NULL"),
        }
    }

    fn render_cmp(buf: &mut String, args: &mut Vec<Value>, op: &str, value: &Value) {
        buf.push(' ');
        buf.push_str(op);
        buf.push_str(" ?");
        args.push(value.clone());
    }

    fn render_list(buf: &mut String, args: &mut Vec<Value>, op: &str, vals: &[Value]) {
        buf.push(' ');
        buf.push_str(op);
        buf.push('(');
        for (index, val) in vals.iter().enumerate() {
            if index > 0 {
                buf.push(',');
            }
            buf.push('?');
            args.push(val.clone());
        }
        buf.push(')');
    }
}

/// A renderable WHERE fragment combining field comparisons with AND or OR.
///
/// Fields render in insertion order, so the SQL text and argument order are
/// deterministic. A condition with zero renderable fields produces an empty
/// string and appends no arguments.
#[derive(Clone, Debug)]
pub struct Condition {
    op: BoolOp,
    fields: Vec<(String, Op)>,
}

impl Condition {
    /// Create a condition whose fields are joined with AND.
    pub fn all() -> Self {
        Condition {
            op: BoolOp::And,
            fields: Vec::new(),
        }
    }

    /// Create a condition whose fields are joined with OR.
    pub fn any() -> Self {
        Condition {
            op: BoolOp::Or,
            fields: Vec::new(),
        }
    }

    /// Add a field comparison. No identifier quoting is performed; callers
    /// supply literal column references.
    pub fn field(mut self, column: impl Into<String>, op: Op) -> Self {
        self.fields.push((column.into(), op));
        self
    }

    /// The combinator joining this condition's fields.
    pub fn bool_op(&self) -> BoolOp {
        self.op
    }

    /// Whether nothing would render.
    pub fn is_empty(&self) -> bool {
        self.fields.iter().all(|(_, op)| op.is_empty())
    }

    /// Render `(a = ? AND b IN(?,?))`, appending positional arguments.
    ///
    /// Returns an empty string (and appends nothing) when no field renders.
    pub fn sql(&self, args: &mut Vec<Value>) -> String {
        let mut buf = String::new();
        for (column, op) in &self.fields {
            if op.is_empty() {
                continue;
            }

            if buf.is_empty() {
                buf.push('(');
            } else {
                buf.push(' ');
                buf.push_str(self.op.as_str());
                buf.push(' ');
            }
            op.render(column, &mut buf, args);
        }

        if buf.is_empty() {
            return buf;
        }
        buf.push(')');
        buf
    }
}

/// An ordered chain of conditions joined by explicit per-link combinators.
///
/// The first condition that renders non-empty is prefixed with ` WHERE `;
/// each later non-empty condition is prefixed with its own combinator.
/// Conditions that render empty are skipped entirely and do not consume a
/// combinator slot.
#[derive(Clone, Debug, Default)]
pub struct Where {
    links: Vec<(BoolOp, Condition)>,
}

impl Where {
    /// Create a chain starting with one condition.
    pub fn new(condition: Condition) -> Self {
        Where {
            links: vec![(BoolOp::And, condition)],
        }
    }

    /// Append a condition joined with AND.
    pub fn and(mut self, condition: Condition) -> Self {
        self.links.push((BoolOp::And, condition));
        self
    }

    /// Append a condition joined with OR.
    pub fn or(mut self, condition: Condition) -> Self {
        self.links.push((BoolOp::Or, condition));
        self
    }

    /// Whether the chain holds no conditions.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Remove every condition, keeping allocations.
    pub fn clear(&mut self) {
        self.links.clear();
    }

    /// Render the full clause including the leading ` WHERE `, or an empty
    /// string when every condition renders empty.
    pub fn sql(&self, args: &mut Vec<Value>) -> String {
        let mut buf = String::new();
        for (op, condition) in &self.links {
            let fragment = condition.sql(args);
            if fragment.is_empty() {
                continue;
            }

            if buf.is_empty() {
                buf.push_str(" WHERE ");
            } else {
                buf.push(' ');
                buf.push_str(op.as_str());
                buf.push(' ');
            }
            buf.push_str(&fragment);
        }
        buf
    }
}

impl From<Condition> for Where {
    fn from(condition: Condition) -> Self {
        Where::new(condition)
    }
}
