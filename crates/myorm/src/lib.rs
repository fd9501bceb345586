//! # myorm
//!
//! A lightweight MySQL ORM with primary/replica failover.
//!
//! ## Features
//!
//! - **SQL explicit**: conditions and builders render plain parameterized SQL (`?` placeholders)
//! - **Type-safe mapping**: Row → Struct via the `FromRow` trait and static `Model` descriptors
//! - **Minimal magic**: no codegen, field descriptors are plain function pointers
//! - **Primary/replica routing**: reads hit replicas, writes and transactions hit primaries
//! - **Cooldown failover**: pools that fail connectivity checks are quarantined and retried
//!   after a configurable interval
//! - **Transaction-friendly**: a `Transaction` exposes the same operations as the group
//!
//! ## Quick start
//!
//! ```ignore
//! use myorm::{Condition, Group, GroupOption, Op, QueryBuilder};
//!
//! let group = Group::new(&options)?;
//!
//! // Raw query against a replica
//! let rows = group.query("SELECT * FROM user WHERE id = ?", vec![7.into()]).await?;
//!
//! // Builder-driven
//! let qb = QueryBuilder::acquire()
//!     .from("user")
//!     .and_where(Condition::all().field("status", Op::eq(1)))
//!     .order_by(&["id DESC"])
//!     .limit(10);
//! let users: Vec<User> = group.fetch_all(&qb, false).await?;
//! QueryBuilder::release(qb);
//!
//! // Transactional writes on a primary
//! let mut tx = group.begin().await?;
//! tx.insert_model(&mut user).await?;
//! tx.commit().await?;
//! ```

pub mod condition;
pub mod error;
pub mod group;
pub mod model;
pub mod pool;
pub mod query;
pub mod row;
pub mod sql;
pub mod transaction;

pub use condition::{BoolOp, Condition, Op, Where};
pub use error::{OrmError, OrmResult};
pub use group::{Group, GroupOption};
pub use model::{
    FieldDef, Model, delete_model_sql, find_one_model_sql, insert_models_sql, update_model_sql,
};
pub use pool::{
    ExecResult, IsolationLevel, MysqlPool, MysqlTxHandle, Pool, PoolOption, TxHandle, TxOptions,
};
pub use query::QueryBuilder;
pub use row::{FromRow, RowMap};
pub use sql::{Row, delete_sql, insert_sql, update_sql};
pub use transaction::Transaction;

// Re-export the driver's value type; every argument list is built from it.
pub use mysql_async::Value;
