use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Clone)]
pub struct ConnectionPool {
    pool: Arc<SqlitePool>,
}

impl ConnectionPool {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        if let Some(parent) = options.get_filename().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Opens an existing database without creating, migrating or writing it.
    pub async fn open_read_only(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(false)
            .read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Single-connection in-memory database; every pooled connection to
    /// `:memory:` would otherwise see its own empty schema.
    pub async fn from_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_database_is_created_and_migrated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("offline.db");
        let url = format!("sqlite:{}", path.display());

        let pool = ConnectionPool::new(&url, 2).await.unwrap();
        pool.migrate().await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'offline_files'",
        )
        .fetch_all(pool.get_pool())
        .await
        .unwrap();
        assert_eq!(tables.len(), 1);
        assert!(path.exists());
        pool.close().await;
    }

    #[tokio::test]
    async fn read_only_open_never_creates_a_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typo.db");
        let url = format!("sqlite:{}", path.display());

        assert!(ConnectionPool::open_read_only(&url).await.is_err());
        assert!(!path.exists());

        let writer = ConnectionPool::new(&url, 1).await.unwrap();
        writer.migrate().await.unwrap();
        writer.close().await;

        let reader = ConnectionPool::open_read_only(&url).await.unwrap();
        let insert =
            sqlx::query("INSERT INTO sync_locks (name, holder, expires_at) VALUES ('x', 'y', 0)")
                .execute(reader.get_pool())
                .await;
        assert!(insert.is_err());
        reader.close().await;
    }
}
