use crate::application::ports::local_store::{LocalStore, StoreTable};
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process [`LocalStore`] for tests and sessions without a database.
#[derive(Default)]
pub struct MemoryLocalStore {
    tables: RwLock<HashMap<StoreTable, Vec<(String, Value)>>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn get(&self, table: StoreTable, key: &str) -> Result<Option<Value>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&table)
            .and_then(|rows| rows.iter().find(|(k, _)| k == key))
            .map(|(_, value)| value.clone()))
    }

    async fn get_all(&self, table: StoreTable) -> Result<Vec<Value>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&table)
            .map(|rows| rows.iter().map(|(_, value)| value.clone()).collect())
            .unwrap_or_default())
    }

    async fn put(&self, table: StoreTable, key: &str, record: Value) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table).or_default();
        match rows.iter_mut().find(|(k, _)| k == key) {
            Some((_, value)) => *value = record,
            None => rows.push((key.to_string(), record)),
        }
        Ok(())
    }

    async fn delete(&self, table: StoreTable, key: &str) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if let Some(rows) = tables.get_mut(&table) {
            rows.retain(|(k, _)| k != key);
        }
        Ok(())
    }

    async fn clear(&self, table: StoreTable) -> Result<(), AppError> {
        self.tables.write().await.remove(&table);
        Ok(())
    }
}
