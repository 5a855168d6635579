use super::rows::StoredRecordRow;
use crate::application::ports::local_store::{LocalStore, StoreTable};
use crate::infrastructure::database::ConnectionPool;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

/// [`LocalStore`] over the migrated SQLite schema. Each logical table maps to
/// a `(record_key, payload, updated_at)` table holding JSON payloads.
pub struct SqliteLocalStore {
    pool: ConnectionPool,
}

impl SqliteLocalStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    fn parse(table: StoreTable, row: StoredRecordRow) -> Result<Value, AppError> {
        serde_json::from_str(&row.payload).map_err(|err| {
            AppError::DeserializationError(format!(
                "{table}/{}: {err} (updated_at={})",
                row.record_key, row.updated_at
            ))
        })
    }
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn get(&self, table: StoreTable, key: &str) -> Result<Option<Value>, AppError> {
        let sql = format!(
            "SELECT record_key, payload, updated_at FROM {} WHERE record_key = ?1",
            table.as_str()
        );
        let row = sqlx::query_as::<_, StoredRecordRow>(&sql)
            .bind(key)
            .fetch_optional(self.pool.get_pool())
            .await?;
        row.map(|row| Self::parse(table, row)).transpose()
    }

    async fn get_all(&self, table: StoreTable) -> Result<Vec<Value>, AppError> {
        let sql = format!(
            "SELECT record_key, payload, updated_at FROM {} ORDER BY rowid",
            table.as_str()
        );
        let rows = sqlx::query_as::<_, StoredRecordRow>(&sql)
            .fetch_all(self.pool.get_pool())
            .await?;

        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            match Self::parse(table, row) {
                Ok(value) => values.push(value),
                Err(err) => tracing::warn!(
                    target: "offline::store",
                    table = %table,
                    error = %err,
                    "skipping corrupt row"
                ),
            }
        }
        Ok(values)
    }

    async fn put(&self, table: StoreTable, key: &str, record: Value) -> Result<(), AppError> {
        let sql = format!(
            "INSERT INTO {} (record_key, payload, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(record_key) DO UPDATE SET payload = excluded.payload, \
             updated_at = excluded.updated_at",
            table.as_str()
        );
        sqlx::query(&sql)
            .bind(key)
            .bind(serde_json::to_string(&record)?)
            .bind(Utc::now().timestamp_millis())
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn delete(&self, table: StoreTable, key: &str) -> Result<(), AppError> {
        let sql = format!("DELETE FROM {} WHERE record_key = ?1", table.as_str());
        sqlx::query(&sql)
            .bind(key)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    async fn clear(&self, table: StoreTable) -> Result<(), AppError> {
        let sql = format!("DELETE FROM {}", table.as_str());
        sqlx::query(&sql).execute(self.pool.get_pool()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store() -> SqliteLocalStore {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();
        SqliteLocalStore::new(pool)
    }

    #[tokio::test]
    async fn put_overwrites_and_keeps_insertion_order() {
        let store = store().await;
        let table = StoreTable::PendingRecordActions;

        store.put(table, "b", json!({"id": "b", "v": 1})).await.unwrap();
        store.put(table, "a", json!({"id": "a", "v": 1})).await.unwrap();
        store.put(table, "b", json!({"id": "b", "v": 2})).await.unwrap();

        let all = store.get_all(table).await.unwrap();
        assert_eq!(all, vec![json!({"id": "b", "v": 2}), json!({"id": "a", "v": 1})]);
        assert_eq!(
            store.get(table, "b").await.unwrap(),
            Some(json!({"id": "b", "v": 2}))
        );
    }

    #[tokio::test]
    async fn tables_are_isolated() {
        let store = store().await;
        store
            .put(StoreTable::CachedProjects, "k", json!({"owner": "k"}))
            .await
            .unwrap();

        assert!(store.get(StoreTable::CachedRecords, "k").await.unwrap().is_none());

        store.delete(StoreTable::CachedProjects, "k").await.unwrap();
        assert!(store.get_all(StoreTable::CachedProjects).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_empties_one_table() {
        let store = store().await;
        for table in StoreTable::ALL {
            store.put(table, "x", json!({})).await.unwrap();
        }

        store.clear(StoreTable::OfflineFiles).await.unwrap();

        assert!(store.get_all(StoreTable::OfflineFiles).await.unwrap().is_empty());
        assert_eq!(store.get_all(StoreTable::PendingDeletions).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn closed_pool_reports_storage_unavailable() {
        let store = store().await;
        store.pool().close().await;

        let err = store.get_all(StoreTable::OfflineFiles).await.unwrap_err();
        assert!(err.is_storage_unavailable());
    }
}
