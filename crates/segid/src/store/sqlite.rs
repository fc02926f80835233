use crate::{Error, Range, RangeStore, Result};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// DDL for the allocation table on SQLite.
pub const SQLITE_SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS id_segments (
    biz_tag     TEXT    NOT NULL PRIMARY KEY,
    max_id      INTEGER NOT NULL DEFAULT 0,
    step        INTEGER NOT NULL,
    update_time TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

// The guards keep the statement from writing a record that cannot be
// extended: SQLite would silently promote an overflowing sum to REAL.
const EXTEND: &str = "\
UPDATE id_segments
   SET max_id = max_id + step, update_time = CURRENT_TIMESTAMP
 WHERE biz_tag = ?1 AND step > 0 AND max_id <= 9223372036854775807 - step
RETURNING max_id, step";

const CLASSIFY: &str = "SELECT max_id, step FROM id_segments WHERE biz_tag = ?1";

/// A [`RangeStore`] backed by a SQLite table.
///
/// The extension is a single conditional `UPDATE ... RETURNING` statement.
/// SQLite serializes writers on the database file, so the read-modify-write
/// is indivisible without an explicit row lock and no lock is held across a
/// round trip. When the statement touches no row, a follow-up read tells a
/// missing tag apart from a record that cannot be extended.
#[derive(Debug, Clone)]
pub struct SqliteRangeStore {
    pool: SqlitePool,
}

impl SqliteRangeStore {
    /// Wraps an existing connection pool.
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects a pool with `options` to `url`.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the database could not be opened.
    pub async fn connect(url: &str, options: SqlitePoolOptions) -> Result<Self, sqlx::Error> {
        let pool = options.connect(url).await?;
        Ok(Self::new(pool))
    }

    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn classify_miss(&self, tag: &str) -> Error {
        let row: Result<Option<(i64, i64)>, sqlx::Error> = sqlx::query_as(CLASSIFY)
            .bind(tag)
            .fetch_optional(&self.pool)
            .await;

        match row {
            Ok(None) => Error::tag_not_found(tag),
            Ok(Some((allocated_max, step))) => match Range::extend(tag, allocated_max, step) {
                Err(e) => e,
                // extendable now, so a concurrent writer changed the row
                // between the two statements
                Ok(_) => Error::transaction(tag, "record changed during extension"),
            },
            Err(e) => Error::transaction(tag, format_args!("classify: {e}")),
        }
    }
}

impl RangeStore for SqliteRangeStore {
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    async fn extend_range(&self, tag: &str) -> Result<Range> {
        let row: Option<(i64, i64)> = sqlx::query_as(EXTEND)
            .bind(tag)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::transaction(tag, format_args!("extend: {e}")))?;

        match row {
            Some((ceiling, step)) => Range::from_ceiling(tag, ceiling, step),
            None => Err(self.classify_miss(tag).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn store() -> SqliteRangeStore {
        // one connection: every `sqlite::memory:` connection is its own db
        let store = SqliteRangeStore::connect(
            "sqlite::memory:",
            SqlitePoolOptions::new().max_connections(1),
        )
        .await
        .unwrap();
        sqlx::query(SQLITE_SCHEMA)
            .execute(store.pool())
            .await
            .unwrap();
        store
    }

    async fn provision(store: &SqliteRangeStore, tag: &str, max_id: i64, step: i64) {
        sqlx::query("INSERT INTO id_segments (biz_tag, max_id, step) VALUES (?1, ?2, ?3)")
            .bind(tag)
            .bind(max_id)
            .bind(step)
            .execute(store.pool())
            .await
            .unwrap();
    }

    async fn max_id(store: &SqliteRangeStore, tag: &str) -> i64 {
        let (max_id,): (i64,) = sqlx::query_as("SELECT max_id FROM id_segments WHERE biz_tag = ?1")
            .bind(tag)
            .fetch_one(store.pool())
            .await
            .unwrap();
        max_id
    }

    #[tokio::test]
    async fn extends_by_step() {
        let store = store().await;
        provision(&store, "order", 100, 10).await;

        let range = store.extend_range("order").await.unwrap();
        assert_eq!((range.floor(), range.ceiling(), range.step()), (101, 110, 10));
        let range = store.extend_range("order").await.unwrap();
        assert_eq!((range.floor(), range.ceiling()), (111, 120));
        assert_eq!(max_id(&store, "order").await, 120);
    }

    #[tokio::test]
    async fn missing_tag_is_not_created() {
        let store = store().await;
        assert_eq!(
            store.extend_range("ghost").await,
            Err(Error::TagNotFound {
                tag: "ghost".into()
            })
        );
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM id_segments")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn unextendable_records_are_not_written() {
        let store = store().await;
        provision(&store, "zero", 7, 0).await;
        provision(&store, "full", i64::MAX - 2, 5).await;

        assert!(matches!(
            store.extend_range("zero").await,
            Err(Error::InvalidRecord { .. })
        ));
        assert!(matches!(
            store.extend_range("full").await,
            Err(Error::InvalidRecord { .. })
        ));
        assert_eq!(max_id(&store, "zero").await, 7);
        assert_eq!(max_id(&store, "full").await, i64::MAX - 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_extensions_are_disjoint() {
        let store = Arc::new(store().await);
        provision(&store, "order", 0, 3).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let mut ranges = Vec::new();
                    for _ in 0..10 {
                        ranges.push(store.extend_range("order").await.unwrap());
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
        for pair in ranges.windows(2) {
            assert_eq!(pair[1].floor(), pair[0].ceiling() + 1);
        }
        assert_eq!(max_id(&store, "order").await, 8 * 10 * 3);
    }
}
