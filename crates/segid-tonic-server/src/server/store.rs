//! Selection and lifecycle of the range store behind the service.

use crate::server::config::{Backend, MemorySeed, ServerConfig};
use anyhow::Context;
use segid::{MemoryRangeStore, MySqlRangeStore, Range, RangeStore, SqliteRangeStore};
use sqlx::{mysql::MySqlPoolOptions, sqlite::SqlitePoolOptions};

/// The store chosen by `DATABASE_URL`.
pub enum BackendStore {
    Memory(MemoryRangeStore),
    MySql(MySqlRangeStore),
    Sqlite(SqliteRangeStore),
}

impl BackendStore {
    /// Opens the configured store.
    ///
    /// SQL pools connect eagerly, so an unreachable database fails startup
    /// instead of the first request.
    pub async fn connect(config: &ServerConfig) -> anyhow::Result<Self> {
        let store = match config.backend {
            Backend::Memory => Self::memory(&config.memory_tags),
            Backend::MySql => {
                let options = mysql_options(config);
                let store = MySqlRangeStore::connect(&config.database_url, options)
                    .await
                    .context("failed to connect to MySQL")?;
                Self::MySql(store)
            }
            Backend::Sqlite => {
                let options = sqlite_options(config);
                let store = SqliteRangeStore::connect(&config.database_url, options)
                    .await
                    .context("failed to open SQLite database")?;
                Self::Sqlite(store)
            }
        };

        tracing::info!(backend = %config.backend, "range store ready");
        Ok(store)
    }

    /// A process-local store provisioned with `seeds`.
    pub fn memory(seeds: &[MemorySeed]) -> Self {
        let store = MemoryRangeStore::new();
        for seed in seeds {
            store.provision(seed.tag.as_str(), seed.allocated_max, seed.step);
        }
        Self::Memory(store)
    }

    /// Releases pooled connections. A no-op for the memory store.
    pub async fn close(&self) {
        match self {
            Self::Memory(_) => {}
            Self::MySql(store) => store.close().await,
            Self::Sqlite(store) => store.close().await,
        }
    }
}

impl RangeStore for BackendStore {
    async fn extend_range(&self, tag: &str) -> segid::Result<Range> {
        match self {
            Self::Memory(store) => store.extend_range(tag).await,
            Self::MySql(store) => store.extend_range(tag).await,
            Self::Sqlite(store) => store.extend_range(tag).await,
        }
    }
}

// Acquiring a connection counts against the same budget as the extension.
fn mysql_options(config: &ServerConfig) -> MySqlPoolOptions {
    let pool = &config.pool;
    MySqlPoolOptions::new()
        .max_connections(pool.max_connections)
        .min_connections(pool.min_connections)
        .max_lifetime(pool.max_lifetime)
        .acquire_timeout(config.generator.store_timeout)
}

fn sqlite_options(config: &ServerConfig) -> SqlitePoolOptions {
    let pool = &config.pool;
    SqlitePoolOptions::new()
        .max_connections(pool.max_connections)
        .min_connections(pool.min_connections)
        .max_lifetime(pool.max_lifetime)
        .acquire_timeout(config.generator.store_timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use segid::Error;

    #[tokio::test]
    async fn memory_store_serves_seeded_tags() {
        let store = BackendStore::memory(&[MemorySeed {
            tag: "order".into(),
            allocated_max: 100,
            step: 10,
        }]);

        let range = store.extend_range("order").await.unwrap();
        assert_eq!((range.floor(), range.ceiling()), (101, 110));
        assert!(matches!(
            store.extend_range("user").await,
            Err(Error::TagNotFound { .. })
        ));
        store.close().await;
    }
}
