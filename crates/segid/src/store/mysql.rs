use crate::{Error, Range, RangeStore, Result};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// DDL for the allocation table on MySQL.
///
/// Rows are provisioned out-of-band, for example:
///
/// ```sql
/// INSERT INTO id_segments (biz_tag, max_id, step) VALUES ('order', 0, 1000);
/// ```
pub const MYSQL_SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS id_segments (
    biz_tag     VARCHAR(128) NOT NULL,
    max_id      BIGINT       NOT NULL DEFAULT 0,
    step        INT          NOT NULL,
    update_time TIMESTAMP    NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
    PRIMARY KEY (biz_tag)
) ENGINE = InnoDB";

const SELECT_FOR_UPDATE: &str =
    "SELECT max_id, CAST(step AS SIGNED) FROM id_segments WHERE biz_tag = ? FOR UPDATE";

const UPDATE_MAX_ID: &str =
    "UPDATE id_segments SET max_id = ?, update_time = CURRENT_TIMESTAMP WHERE biz_tag = ?";

/// A [`RangeStore`] backed by a MySQL (InnoDB) table.
///
/// Each extension runs in its own transaction:
///
/// 1. `SELECT ... FOR UPDATE` takes an exclusive row lock on the tag, so
///    concurrent extenders of the same tag, in any process, queue behind it
///    while other tags proceed.
/// 2. The new ceiling is computed and written back.
/// 3. The transaction commits, releasing the lock.
///
/// Any error before the commit drops the transaction, which rolls it back.
#[derive(Debug, Clone)]
pub struct MySqlRangeStore {
    pool: MySqlPool,
}

impl MySqlRangeStore {
    /// Wraps an existing connection pool.
    pub const fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Connects a pool with `options` to `url`.
    ///
    /// Connecting eagerly opens `min_connections`, so an unreachable or
    /// misconfigured database is reported here rather than on the first
    /// request.
    ///
    /// # Errors
    ///
    /// Returns the driver error if no connection could be established.
    pub async fn connect(url: &str, options: MySqlPoolOptions) -> Result<Self, sqlx::Error> {
        let pool = options.connect(url).await?;
        Ok(Self::new(pool))
    }

    pub const fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Closes the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl RangeStore for MySqlRangeStore {
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    async fn extend_range(&self, tag: &str) -> Result<Range> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::transaction(tag, format_args!("begin: {e}")))?;

        let row: Option<(i64, i64)> = sqlx::query_as(SELECT_FOR_UPDATE)
            .bind(tag)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| Error::transaction(tag, format_args!("lock row: {e}")))?;

        let Some((allocated_max, step)) = row else {
            return Err(Error::tag_not_found(tag));
        };
        let range = Range::extend(tag, allocated_max, step)?;

        sqlx::query(UPDATE_MAX_ID)
            .bind(range.ceiling())
            .bind(tag)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::transaction(tag, format_args!("update max_id: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| Error::transaction(tag, format_args!("commit: {e}")))?;

        Ok(range)
    }
}

// Needs a live server: SEGID_MYSQL_URL=mysql://... cargo test --features mysql -- --ignored
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn store() -> MySqlRangeStore {
        let url = std::env::var("SEGID_MYSQL_URL").expect("SEGID_MYSQL_URL must be set");
        let store = MySqlRangeStore::connect(&url, MySqlPoolOptions::new().max_connections(8))
            .await
            .unwrap();
        sqlx::query(MYSQL_SCHEMA)
            .execute(store.pool())
            .await
            .unwrap();
        store
    }

    // the database outlives the test run, so rows are reset rather than inserted
    async fn provision(store: &MySqlRangeStore, tag: &str, max_id: i64, step: i64) {
        sqlx::query("REPLACE INTO id_segments (biz_tag, max_id, step) VALUES (?, ?, ?)")
            .bind(tag)
            .bind(max_id)
            .bind(step)
            .execute(store.pool())
            .await
            .unwrap();
    }

    async fn max_id(store: &MySqlRangeStore, tag: &str) -> i64 {
        let (max_id,): (i64,) = sqlx::query_as("SELECT max_id FROM id_segments WHERE biz_tag = ?")
            .bind(tag)
            .fetch_one(store.pool())
            .await
            .unwrap();
        max_id
    }

    #[tokio::test]
    #[ignore = "needs SEGID_MYSQL_URL"]
    async fn extends_by_step() {
        let store = store().await;
        provision(&store, "mysql-extends", 100, 10).await;

        let range = store.extend_range("mysql-extends").await.unwrap();
        assert_eq!((range.floor(), range.ceiling(), range.step()), (101, 110, 10));
        let range = store.extend_range("mysql-extends").await.unwrap();
        assert_eq!((range.floor(), range.ceiling()), (111, 120));
        assert_eq!(max_id(&store, "mysql-extends").await, 120);
    }

    #[tokio::test]
    #[ignore = "needs SEGID_MYSQL_URL"]
    async fn missing_tag_is_not_created() {
        let store = store().await;
        sqlx::query("DELETE FROM id_segments WHERE biz_tag = ?")
            .bind("mysql-ghost")
            .execute(store.pool())
            .await
            .unwrap();

        assert_eq!(
            store.extend_range("mysql-ghost").await,
            Err(Error::TagNotFound {
                tag: "mysql-ghost".into()
            })
        );
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM id_segments WHERE biz_tag = ?")
                .bind("mysql-ghost")
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    #[ignore = "needs SEGID_MYSQL_URL"]
    async fn unextendable_records_are_rolled_back() {
        let store = store().await;
        provision(&store, "mysql-zero", 7, 0).await;
        provision(&store, "mysql-full", i64::MAX - 2, 5).await;

        assert!(matches!(
            store.extend_range("mysql-zero").await,
            Err(Error::InvalidRecord { .. })
        ));
        assert!(matches!(
            store.extend_range("mysql-full").await,
            Err(Error::InvalidRecord { .. })
        ));
        assert_eq!(max_id(&store, "mysql-zero").await, 7);
        assert_eq!(max_id(&store, "mysql-full").await, i64::MAX - 2);

        // the row locks were released with the rollback
        provision(&store, "mysql-zero", 7, 4).await;
        let range = store.extend_range("mysql-zero").await.unwrap();
        assert_eq!((range.floor(), range.ceiling()), (8, 11));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "needs SEGID_MYSQL_URL"]
    async fn concurrent_extensions_are_disjoint() {
        let store = Arc::new(store().await);
        provision(&store, "mysql-concurrent", 0, 3).await;

        // 16 tasks over 8 connections: extenders serialize on the row lock
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let mut ranges = Vec::new();
                    for _ in 0..10 {
                        ranges.push(store.extend_range("mysql-concurrent").await.unwrap());
                    }
                    ranges
                })
            })
            .collect();

        let mut ranges = Vec::new();
        for handle in handles {
            ranges.extend(handle.await.unwrap());
        }
        ranges.sort_by_key(Range::floor);
        assert_eq!(ranges[0].floor(), 1);
        for pair in ranges.windows(2) {
            assert_eq!(pair[1].floor(), pair[0].ceiling() + 1);
        }
        assert_eq!(max_id(&store, "mysql-concurrent").await, 16 * 10 * 3);
    }
}
