//! Transactions pinned to one primary connection.

use mysql_async::Value;
use tracing::warn;

use crate::condition::{Condition, Where};
use crate::error::{OrmError, OrmResult};
use crate::model::{
    Model, delete_model_sql, find_one_model_sql, insert_models_sql, update_model_sql,
};
use crate::pool::{ExecResult, MysqlTxHandle, TxHandle};
use crate::query::QueryBuilder;
use crate::row::{FromRow, RowMap};
use crate::sql::{Row, delete_sql, insert_sql, update_sql};

/// An open transaction exposing the same operation surface as the group,
/// every statement running on the one pinned connection.
///
/// [`commit`](Transaction::commit) or [`rollback`](Transaction::rollback)
/// consume the transaction. Dropping it without either logs a warning; the
/// connection's return-to-pool reset rolls the work back server-side.
pub struct Transaction<H: TxHandle = MysqlTxHandle> {
    handle: Option<H>,
}

impl<H: TxHandle> Transaction<H> {
    pub(crate) fn new(handle: H) -> Self {
        Transaction {
            handle: Some(handle),
        }
    }

    fn handle_mut(&mut self) -> OrmResult<&mut H> {
        self.handle
            .as_mut()
            .ok_or_else(|| OrmError::Other("transaction already finished".into()))
    }

    /// Run a query on the transaction's connection.
    pub async fn query(&mut self, sql: &str, args: Vec<Value>) -> OrmResult<Vec<RowMap>> {
        self.handle_mut()?.query(sql, args).await
    }

    /// Run a write statement on the transaction's connection.
    pub async fn execute(&mut self, sql: &str, args: Vec<Value>) -> OrmResult<ExecResult> {
        self.handle_mut()?.execute(sql, args).await
    }

    /// Run a built SELECT.
    pub async fn find(&mut self, qb: &QueryBuilder) -> OrmResult<Vec<RowMap>> {
        let mut args = Vec::new();
        let sql = qb.sql(&mut args);
        self.query(&sql, args).await
    }

    /// Fetch at most one row from a table matching the WHERE chain.
    pub async fn find_one(&mut self, table: &str, where_: Where) -> OrmResult<Option<RowMap>> {
        let qb = QueryBuilder::acquire()
            .from(table)
            .with_where(where_)
            .limit(1);
        let mut args = Vec::new();
        let sql = qb.sql(&mut args);
        QueryBuilder::release(qb);

        let mut rows = self.query(&sql, args).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// Run a built SELECT and hydrate each row.
    pub async fn fetch_all<T: FromRow>(&mut self, qb: &QueryBuilder) -> OrmResult<Vec<T>> {
        let rows = self.find(qb).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Multi-row insert of ad-hoc rows.
    pub async fn insert(&mut self, table: &str, rows: &[Row]) -> OrmResult<ExecResult> {
        let mut args = Vec::new();
        let sql = insert_sql(&mut args, table, rows)?;
        self.execute(&sql, args).await
    }

    /// Update every row matching the WHERE chain.
    pub async fn update_all(
        &mut self,
        table: &str,
        set: &Row,
        where_: &Where,
    ) -> OrmResult<ExecResult> {
        let mut args = Vec::new();
        let sql = update_sql(&mut args, table, set, where_)?;
        self.execute(&sql, args).await
    }

    /// Delete every row matching the WHERE chain.
    pub async fn delete_all(&mut self, table: &str, where_: &Where) -> OrmResult<ExecResult> {
        let mut args = Vec::new();
        let sql = delete_sql(&mut args, table, where_);
        self.execute(&sql, args).await
    }

    /// Insert one record, running its create hooks.
    pub async fn insert_model<M: Model + 'static>(&mut self, model: &mut M) -> OrmResult<ExecResult> {
        self.insert_models(std::slice::from_mut(model)).await
    }

    /// Insert several records in one statement, running create hooks on each.
    pub async fn insert_models<M: Model + 'static>(&mut self, models: &mut [M]) -> OrmResult<ExecResult> {
        let mut args = Vec::new();
        let sql = insert_models_sql(&mut args, models)?;
        self.execute(&sql, args).await
    }

    /// Update one record keyed by its primary fields.
    pub async fn update_model<M: Model + 'static>(&mut self, model: &mut M) -> OrmResult<ExecResult> {
        let mut args = Vec::new();
        let sql = update_model_sql(&mut args, model)?;
        self.execute(&sql, args).await
    }

    /// Delete one record keyed by its primary fields.
    pub async fn delete_model<M: Model + 'static>(&mut self, model: &M) -> OrmResult<ExecResult> {
        let mut args = Vec::new();
        let sql = delete_model_sql(&mut args, model)?;
        self.execute(&sql, args).await
    }

    /// Fetch and hydrate at most one record matching the condition.
    pub async fn find_one_model<M: Model + 'static>(
        &mut self,
        condition: Condition,
    ) -> OrmResult<Option<M>> {
        let mut args = Vec::new();
        let sql = find_one_model_sql::<M>(&mut args, condition);
        let rows = self.query(&sql, args).await?;
        rows.first().map(M::from_row).transpose()
    }

    /// Commit and release the connection.
    pub async fn commit(mut self) -> OrmResult<()> {
        match self.handle.take() {
            Some(handle) => handle.commit().await,
            None => Err(OrmError::Other("transaction already finished".into())),
        }
    }

    /// Roll back and release the connection.
    pub async fn rollback(mut self) -> OrmResult<()> {
        match self.handle.take() {
            Some(handle) => handle.rollback().await,
            None => Err(OrmError::Other("transaction already finished".into())),
        }
    }
}

impl<H: TxHandle> Drop for Transaction<H> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            warn!("transaction dropped without commit or rollback, work will be rolled back");
        }
    }
}
