pub mod lease_lock;
pub mod memory_store;
pub mod rows;
pub mod sqlite_store;
pub mod unavailable_store;

pub use lease_lock::{NoopSyncLock, SqliteLeaseLock};
pub use memory_store::MemoryLocalStore;
pub use sqlite_store::SqliteLocalStore;
pub use unavailable_store::UnavailableLocalStore;

use crate::application::ports::local_store::LocalStore;
use crate::infrastructure::database::ConnectionPool;
use crate::shared::config::DatabaseConfig;
use std::sync::Arc;

/// Local store plus the pool backing it, when there is one.
pub struct OpenedStore {
    pub store: Arc<dyn LocalStore>,
    pub pool: Option<ConnectionPool>,
}

/// Opens and migrates the SQLite store. Failure is not fatal: the returned
/// store then answers every call with `StorageUnavailable`.
pub async fn open_local_store(config: &DatabaseConfig) -> OpenedStore {
    let pool = match ConnectionPool::new(&config.url, config.max_connections).await {
        Ok(pool) => pool,
        Err(err) => {
            tracing::warn!(
                target: "offline::store",
                url = %config.url,
                error = %err,
                "failed to open local store; offline queueing disabled"
            );
            return unavailable(err.to_string());
        }
    };

    if let Err(err) = pool.migrate().await {
        tracing::warn!(
            target: "offline::store",
            url = %config.url,
            error = %err,
            "failed to migrate local store; offline queueing disabled"
        );
        pool.close().await;
        return unavailable(err.to_string());
    }

    tracing::info!(target: "offline::store", url = %config.url, "local store ready");
    OpenedStore {
        store: Arc::new(SqliteLocalStore::new(pool.clone())),
        pool: Some(pool),
    }
}

fn unavailable(reason: String) -> OpenedStore {
    OpenedStore {
        store: Arc::new(UnavailableLocalStore::new(reason)),
        pool: None,
    }
}
