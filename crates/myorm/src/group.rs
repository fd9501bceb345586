//! Primary/replica connection group with cooldown-gated failover.
//!
//! Every pool carries a `bad_since` timestamp (0 when healthy). Connectivity
//! failures mark the pool bad and the operation moves to the next candidate;
//! a bad pool is only probed again once its cooldown has elapsed, and a
//! successful reply clears the mark. Server-side errors never touch health:
//! a syntax error proves the link works.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use mysql_async::Value;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::condition::{Condition, Where};
use crate::error::{OrmError, OrmResult};
use crate::model::{
    Model, delete_model_sql, find_one_model_sql, insert_models_sql, update_model_sql,
};
use crate::pool::{ExecResult, MysqlPool, Pool, PoolOption, TxOptions};
use crate::query::QueryBuilder;
use crate::row::{FromRow, RowMap};
use crate::sql::{Row, delete_sql, insert_sql, update_sql};
use crate::transaction::Transaction;

/// Configuration for a connection group, loadable from app config.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupOption {
    /// Primary pools; at least one is required.
    pub masters: Vec<PoolOption>,
    /// Replica pools; when empty, reads share the primary pools.
    pub slaves: Vec<PoolOption>,
    /// Seconds a pool stays quarantined after a connectivity failure.
    pub retry_interval: i64,
}

impl Default for GroupOption {
    fn default() -> Self {
        GroupOption {
            masters: Vec::new(),
            slaves: Vec::new(),
            retry_interval: 60,
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// One pool plus its health bookkeeping.
#[derive(Debug)]
struct Member<P> {
    pool: P,
    /// Unix seconds of the last connectivity failure; 0 means healthy.
    bad_since: AtomicI64,
}

impl<P> Member<P> {
    fn new(pool: P) -> Self {
        Member {
            pool,
            bad_since: AtomicI64::new(0),
        }
    }

    fn bad_since(&self) -> i64 {
        self.bad_since.load(Ordering::Acquire)
    }

    /// Record a connectivity failure. Only the first marker in a race wins,
    /// so the quarantine window is not extended by concurrent failures.
    fn mark_down(&self) {
        let _ = self.bad_since.compare_exchange(
            0,
            unix_now(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    fn mark_up(&self) {
        self.bad_since.store(0, Ordering::Release);
    }
}

/// A set of primary pools and a set of replica pools with failover routing.
///
/// Reads go to replicas unless the caller demands primary consistency;
/// writes and transactions always go to primaries. When no replicas are
/// configured the replica set shares the primary members, health state
/// included.
#[derive(Debug)]
pub struct Group<P: Pool = MysqlPool> {
    masters: Vec<Arc<Member<P>>>,
    replicas: Vec<Arc<Member<P>>>,
    retry_interval: i64,
}

impl Group<MysqlPool> {
    /// Build a group from configuration.
    pub fn new(option: &GroupOption) -> OrmResult<Self> {
        if option.masters.is_empty() {
            return Err(OrmError::Pool("no primary pool configured".into()));
        }
        let masters = option
            .masters
            .iter()
            .map(MysqlPool::new)
            .collect::<OrmResult<Vec<_>>>()?;
        let replicas = option
            .slaves
            .iter()
            .map(MysqlPool::new)
            .collect::<OrmResult<Vec<_>>>()?;
        Ok(Self::with_pools(masters, replicas, option.retry_interval))
    }
}

impl<P: Pool> Group<P> {
    /// Build a group from already-constructed pools. An empty replica list
    /// aliases the primary members.
    pub fn with_pools(masters: Vec<P>, replicas: Vec<P>, retry_interval: i64) -> Self {
        let masters: Vec<Arc<Member<P>>> =
            masters.into_iter().map(|p| Arc::new(Member::new(p))).collect();
        let replicas: Vec<Arc<Member<P>>> = if replicas.is_empty() {
            masters.clone()
        } else {
            replicas.into_iter().map(|p| Arc::new(Member::new(p))).collect()
        };
        Group {
            masters,
            replicas,
            retry_interval,
        }
    }

    fn set(&self, primary: bool) -> &[Arc<Member<P>>] {
        if primary { &self.masters } else { &self.replicas }
    }

    fn exhausted(primary: bool) -> OrmError {
        if primary {
            OrmError::NoPrimaryAvailable
        } else {
            OrmError::NoReplicaAvailable
        }
    }

    /// Choose the next member to try. Returns the member together with the
    /// `bad_since` observed at pick time so callers can clear it on success.
    ///
    /// Single-member sets are always returned as-is. Otherwise the first
    /// healthy member wins; failing that, the first member whose cooldown
    /// has elapsed is probed (its timestamp is bumped so concurrent callers
    /// do not pile onto the same recovering pool); failing that, member 0.
    fn pick<'a>(&self, set: &'a [Arc<Member<P>>]) -> (&'a Arc<Member<P>>, i64) {
        if set.len() == 1 {
            return (&set[0], set[0].bad_since());
        }

        for member in set {
            if member.bad_since() == 0 {
                return (member, 0);
            }
        }

        let now = unix_now();
        for member in set {
            let bad = member.bad_since();
            if bad + self.retry_interval < now {
                member.bad_since.store(now, Ordering::Release);
                return (member, bad);
            }
        }

        (&set[0], set[0].bad_since())
    }

    /// Settle health after an attempt. Returns `true` when the caller should
    /// move on to the next member.
    fn settle(member: &Member<P>, bad: i64, err: Option<&OrmError>) -> bool {
        match err {
            None => {
                if bad > 0 {
                    debug!("pool recovered, clearing quarantine");
                    member.mark_up();
                }
                false
            }
            Some(e) if e.is_connectivity() => {
                warn!(error = %e, "pool marked bad after connectivity failure");
                member.mark_down();
                true
            }
            Some(_) => {
                // The server answered, so the link works.
                if bad > 0 {
                    member.mark_up();
                }
                false
            }
        }
    }

    /// Run a query with failover over the chosen set.
    pub async fn query_with(
        &self,
        primary: bool,
        sql: &str,
        args: Vec<Value>,
    ) -> OrmResult<Vec<RowMap>> {
        let set = self.set(primary);
        for _ in 0..set.len() {
            let (member, bad) = self.pick(set);
            let result = member.pool.query(sql, args.clone()).await;
            match result {
                Ok(rows) => {
                    Self::settle(member, bad, None);
                    return Ok(rows);
                }
                Err(e) => {
                    if !Self::settle(member, bad, Some(&e)) {
                        return Err(e);
                    }
                }
            }
        }
        Err(Self::exhausted(primary))
    }

    /// Run a read query against the replica set.
    pub async fn query(&self, sql: &str, args: Vec<Value>) -> OrmResult<Vec<RowMap>> {
        self.query_with(false, sql, args).await
    }

    /// Run a write statement with failover over the primary set.
    pub async fn execute(&self, sql: &str, args: Vec<Value>) -> OrmResult<ExecResult> {
        let set = self.set(true);
        for _ in 0..set.len() {
            let (member, bad) = self.pick(set);
            let result = member.pool.execute(sql, args.clone()).await;
            match result {
                Ok(out) => {
                    Self::settle(member, bad, None);
                    return Ok(out);
                }
                Err(e) => {
                    if !Self::settle(member, bad, Some(&e)) {
                        return Err(e);
                    }
                }
            }
        }
        Err(Self::exhausted(true))
    }

    /// Like [`Group::query_with`], bounded by a deadline. Elapsing yields
    /// [`OrmError::Timeout`] and never touches pool health.
    pub async fn query_timeout(
        &self,
        primary: bool,
        sql: &str,
        args: Vec<Value>,
        timeout: Duration,
    ) -> OrmResult<Vec<RowMap>> {
        match tokio::time::timeout(timeout, self.query_with(primary, sql, args)).await {
            Ok(result) => result,
            Err(_) => Err(OrmError::Timeout(timeout)),
        }
    }

    /// Like [`Group::execute`], bounded by a deadline.
    pub async fn execute_timeout(
        &self,
        sql: &str,
        args: Vec<Value>,
        timeout: Duration,
    ) -> OrmResult<ExecResult> {
        match tokio::time::timeout(timeout, self.execute(sql, args)).await {
            Ok(result) => result,
            Err(_) => Err(OrmError::Timeout(timeout)),
        }
    }

    /// Run a built SELECT.
    pub async fn find(&self, qb: &QueryBuilder, primary: bool) -> OrmResult<Vec<RowMap>> {
        let mut args = Vec::new();
        let sql = qb.sql(&mut args);
        self.query_with(primary, &sql, args).await
    }

    /// Fetch at most one row from a table matching the WHERE chain.
    pub async fn find_one(
        &self,
        table: &str,
        where_: Where,
        primary: bool,
    ) -> OrmResult<Option<RowMap>> {
        let qb = QueryBuilder::acquire()
            .from(table)
            .with_where(where_)
            .limit(1);
        let mut args = Vec::new();
        let sql = qb.sql(&mut args);
        QueryBuilder::release(qb);

        let mut rows = self.query_with(primary, &sql, args).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// Run a built SELECT and hydrate each row.
    pub async fn fetch_all<T: FromRow>(
        &self,
        qb: &QueryBuilder,
        primary: bool,
    ) -> OrmResult<Vec<T>> {
        let rows = self.find(qb, primary).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Run a built SELECT and hydrate the first row, if any.
    pub async fn fetch_one<T: FromRow>(
        &self,
        qb: &QueryBuilder,
        primary: bool,
    ) -> OrmResult<Option<T>> {
        let rows = self.find(qb, primary).await?;
        rows.first().map(T::from_row).transpose()
    }

    /// Multi-row insert of ad-hoc rows.
    pub async fn insert(&self, table: &str, rows: &[Row]) -> OrmResult<ExecResult> {
        let mut args = Vec::new();
        let sql = insert_sql(&mut args, table, rows)?;
        self.execute(&sql, args).await
    }

    /// Update every row matching the WHERE chain.
    pub async fn update_all(
        &self,
        table: &str,
        set: &Row,
        where_: &Where,
    ) -> OrmResult<ExecResult> {
        let mut args = Vec::new();
        let sql = update_sql(&mut args, table, set, where_)?;
        self.execute(&sql, args).await
    }

    /// Delete every row matching the WHERE chain.
    pub async fn delete_all(&self, table: &str, where_: &Where) -> OrmResult<ExecResult> {
        let mut args = Vec::new();
        let sql = delete_sql(&mut args, table, where_);
        self.execute(&sql, args).await
    }

    /// Insert one record, running its create hooks.
    pub async fn insert_model<M: Model + 'static>(&self, model: &mut M) -> OrmResult<ExecResult> {
        self.insert_models(std::slice::from_mut(model)).await
    }

    /// Insert several records in one statement, running create hooks on each.
    pub async fn insert_models<M: Model + 'static>(&self, models: &mut [M]) -> OrmResult<ExecResult> {
        let mut args = Vec::new();
        let sql = insert_models_sql(&mut args, models)?;
        self.execute(&sql, args).await
    }

    /// Update one record keyed by its primary fields.
    pub async fn update_model<M: Model + 'static>(&self, model: &mut M) -> OrmResult<ExecResult> {
        let mut args = Vec::new();
        let sql = update_model_sql(&mut args, model)?;
        self.execute(&sql, args).await
    }

    /// Delete one record keyed by its primary fields.
    pub async fn delete_model<M: Model + 'static>(&self, model: &M) -> OrmResult<ExecResult> {
        let mut args = Vec::new();
        let sql = delete_model_sql(&mut args, model)?;
        self.execute(&sql, args).await
    }

    /// Fetch and hydrate at most one record matching the condition.
    pub async fn find_one_model<M: Model + 'static>(
        &self,
        condition: Condition,
        primary: bool,
    ) -> OrmResult<Option<M>> {
        let mut args = Vec::new();
        let sql = find_one_model_sql::<M>(&mut args, condition);
        let rows = self.query_with(primary, &sql, args).await?;
        rows.first().map(M::from_row).transpose()
    }

    /// Open a transaction on a primary pool with default options.
    pub async fn begin(&self) -> OrmResult<Transaction<P::Tx>> {
        self.begin_with(TxOptions::default()).await
    }

    /// Open a transaction on a primary pool, with failover on checkout.
    pub async fn begin_with(&self, opts: TxOptions) -> OrmResult<Transaction<P::Tx>> {
        let set = self.set(true);
        for _ in 0..set.len() {
            let (member, bad) = self.pick(set);
            let result = member.pool.begin(opts).await;
            match result {
                Ok(handle) => {
                    Self::settle(member, bad, None);
                    return Ok(Transaction::new(handle));
                }
                Err(e) => {
                    if !Self::settle(member, bad, Some(&e)) {
                        return Err(e);
                    }
                }
            }
        }
        Err(Self::exhausted(true))
    }

    /// Indexes of quarantined members in the chosen set.
    pub fn bad_pools(&self, primary: bool) -> Vec<usize> {
        self.set(primary)
            .iter()
            .enumerate()
            .filter(|(_, member)| member.bad_since() > 0)
            .map(|(index, _)| index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::TxHandle;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize};

    #[derive(Clone)]
    struct MockPool {
        id: i64,
        refuse: Arc<AtomicBool>,
        server_error: Arc<AtomicBool>,
        delay_ms: Arc<AtomicU64>,
        calls: Arc<AtomicUsize>,
    }

    impl MockPool {
        fn up(id: i64) -> Self {
            MockPool {
                id,
                refuse: Arc::new(AtomicBool::new(false)),
                server_error: Arc::new(AtomicBool::new(false)),
                delay_ms: Arc::new(AtomicU64::new(0)),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn down(id: i64) -> Self {
            let pool = Self::up(id);
            pool.refuse.store(true, Ordering::SeqCst);
            pool
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn gate(&self) -> OrmResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.refuse.load(Ordering::SeqCst) {
                return Err(OrmError::Connection("connection refused".into()));
            }
            if self.server_error.load(Ordering::SeqCst) {
                return Err(OrmError::Other("syntax error".into()));
            }
            Ok(())
        }
    }

    impl Pool for MockPool {
        type Tx = MockTx;

        async fn query(&self, _sql: &str, _args: Vec<Value>) -> OrmResult<Vec<RowMap>> {
            self.gate().await?;
            Ok(vec![RowMap::from_pairs(vec![(
                "pool".to_string(),
                Value::from(self.id),
            )])])
        }

        async fn execute(&self, _sql: &str, _args: Vec<Value>) -> OrmResult<ExecResult> {
            self.gate().await?;
            Ok(ExecResult {
                rows_affected: 1,
                last_insert_id: Some(self.id as u64),
            })
        }

        async fn begin(&self, _opts: TxOptions) -> OrmResult<MockTx> {
            self.gate().await?;
            Ok(MockTx { id: self.id })
        }
    }

    struct MockTx {
        id: i64,
    }

    impl TxHandle for MockTx {
        async fn query(&mut self, _sql: &str, _args: Vec<Value>) -> OrmResult<Vec<RowMap>> {
            Ok(vec![RowMap::from_pairs(vec![(
                "pool".to_string(),
                Value::from(self.id),
            )])])
        }

        async fn execute(&mut self, _sql: &str, _args: Vec<Value>) -> OrmResult<ExecResult> {
            Ok(ExecResult::default())
        }

        async fn commit(self) -> OrmResult<()> {
            Ok(())
        }

        async fn rollback(self) -> OrmResult<()> {
            Ok(())
        }
    }

    fn pool_id(rows: &[RowMap]) -> i64 {
        rows[0].get::<i64>("pool").unwrap()
    }

    #[tokio::test]
    async fn fails_over_past_bad_primaries() {
        let pools = vec![MockPool::down(0), MockPool::down(1), MockPool::up(2)];
        let group = Group::with_pools(pools.clone(), Vec::new(), 60);

        let rows = group.query_with(true, "SELECT 1", Vec::new()).await.unwrap();
        assert_eq!(pool_id(&rows), 2);
        assert_eq!(group.bad_pools(true), vec![0, 1]);

        // Quarantined members are skipped outright on the next call.
        let before = (pools[0].calls(), pools[1].calls());
        let rows = group.query_with(true, "SELECT 1", Vec::new()).await.unwrap();
        assert_eq!(pool_id(&rows), 2);
        assert_eq!((pools[0].calls(), pools[1].calls()), before);
    }

    #[tokio::test]
    async fn cooldown_expiry_readmits_a_recovered_pool() {
        let pools = vec![MockPool::down(0), MockPool::down(1)];
        let group = Group::with_pools(pools.clone(), Vec::new(), 10);

        let err = group.query_with(true, "SELECT 1", Vec::new()).await.unwrap_err();
        assert!(matches!(err, OrmError::NoPrimaryAvailable));

        pools[0].refuse.store(false, Ordering::SeqCst);
        group.masters[0]
            .bad_since
            .store(unix_now() - 100, Ordering::Release);

        let rows = group.query_with(true, "SELECT 1", Vec::new()).await.unwrap();
        assert_eq!(pool_id(&rows), 0);
        assert_eq!(group.bad_pools(true), vec![1]);
    }

    #[tokio::test]
    async fn single_pool_group_attempts_exactly_once() {
        let pool = MockPool::down(0);
        let group = Group::with_pools(vec![pool.clone()], Vec::new(), 60);

        let err = group.query_with(true, "SELECT 1", Vec::new()).await.unwrap_err();
        assert!(matches!(err, OrmError::NoPrimaryAvailable));
        assert_eq!(pool.calls(), 1);
    }

    #[tokio::test]
    async fn server_errors_propagate_without_health_changes() {
        let pools = vec![MockPool::up(0), MockPool::up(1)];
        pools[0].server_error.store(true, Ordering::SeqCst);
        let group = Group::with_pools(pools.clone(), Vec::new(), 60);

        let err = group.query_with(true, "SELECT nope", Vec::new()).await.unwrap_err();
        assert!(matches!(err, OrmError::Other(_)));
        assert!(group.bad_pools(true).is_empty());
        assert_eq!(pools[1].calls(), 0);
    }

    #[tokio::test]
    async fn a_working_reply_clears_a_stale_quarantine() {
        let pool = MockPool::up(0);
        pool.server_error.store(true, Ordering::SeqCst);
        let group = Group::with_pools(vec![pool.clone()], Vec::new(), 60);
        group.masters[0].bad_since.store(unix_now() - 100, Ordering::Release);

        let err = group.query_with(true, "SELECT nope", Vec::new()).await.unwrap_err();
        assert!(matches!(err, OrmError::Other(_)));
        assert!(group.bad_pools(true).is_empty());
    }

    #[tokio::test]
    async fn reads_route_to_replicas_and_writes_to_primaries() {
        let primary = MockPool::up(0);
        let replica = MockPool::up(1);
        let group = Group::with_pools(vec![primary.clone()], vec![replica.clone()], 60);

        let rows = group.query("SELECT 1", Vec::new()).await.unwrap();
        assert_eq!(pool_id(&rows), 1);

        let out = group.execute("DELETE FROM t", Vec::new()).await.unwrap();
        assert_eq!(out.last_insert_id, Some(0));
        assert_eq!(primary.calls(), 1);
        assert_eq!(replica.calls(), 1);
    }

    #[tokio::test]
    async fn empty_replica_set_shares_primary_members() {
        let pool = MockPool::up(0);
        let group = Group::with_pools(vec![pool.clone()], Vec::new(), 60);

        let rows = group.query("SELECT 1", Vec::new()).await.unwrap();
        assert_eq!(pool_id(&rows), 0);

        // Health is shared between the two views of the same member.
        pool.refuse.store(true, Ordering::SeqCst);
        let _ = group.execute("DELETE FROM t", Vec::new()).await;
        assert_eq!(group.bad_pools(true), vec![0]);
        assert_eq!(group.bad_pools(false), vec![0]);
    }

    #[tokio::test]
    async fn timeout_elapsing_reports_timeout_and_leaves_health_alone() {
        let pool = MockPool::up(0);
        pool.delay_ms.store(200, Ordering::SeqCst);
        let group = Group::with_pools(vec![pool.clone()], Vec::new(), 60);

        let err = group
            .query_timeout(true, "SELECT 1", Vec::new(), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(group.bad_pools(true).is_empty());
    }

    #[tokio::test]
    async fn begin_fails_over_to_a_healthy_primary() {
        let pools = vec![MockPool::down(0), MockPool::up(1)];
        let group = Group::with_pools(pools, Vec::new(), 60);

        let mut tx = group.begin().await.unwrap();
        let rows = tx.query("SELECT 1", Vec::new()).await.unwrap();
        assert_eq!(pool_id(&rows), 1);
        tx.commit().await.unwrap();
        assert_eq!(group.bad_pools(true), vec![0]);
    }

    #[test]
    fn group_option_defaults_and_camel_case() {
        let option: GroupOption = serde_json::from_str(
            r#"{"masters":[{"dsn":"mysql://u:p@h/db"}],"retryInterval":30}"#,
        )
        .unwrap();
        assert_eq!(option.masters.len(), 1);
        assert!(option.slaves.is_empty());
        assert_eq!(option.retry_interval, 30);
        assert_eq!(GroupOption::default().retry_interval, 60);
    }

    #[test]
    fn group_requires_a_primary() {
        let err = Group::new(&GroupOption::default()).unwrap_err();
        assert!(matches!(err, OrmError::Pool(_)));
    }
}
