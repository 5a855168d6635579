use crate::shared::error::AppError;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Logical tables of the durable local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreTable {
    OfflineFiles,
    PendingProjectActions,
    PendingColumnActions,
    PendingRecordActions,
    PendingDeletions,
    CachedProjects,
    CachedRecords,
}

impl StoreTable {
    pub const ALL: [StoreTable; 7] = [
        StoreTable::OfflineFiles,
        StoreTable::PendingProjectActions,
        StoreTable::PendingColumnActions,
        StoreTable::PendingRecordActions,
        StoreTable::PendingDeletions,
        StoreTable::CachedProjects,
        StoreTable::CachedRecords,
    ];

    /// Physical table name. Only these static names are ever interpolated into SQL.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreTable::OfflineFiles => "offline_files",
            StoreTable::PendingProjectActions => "pending_project_actions",
            StoreTable::PendingColumnActions => "pending_column_actions",
            StoreTable::PendingRecordActions => "pending_record_actions",
            StoreTable::PendingDeletions => "pending_deletions",
            StoreTable::CachedProjects => "cached_projects",
            StoreTable::CachedRecords => "cached_records",
        }
    }
}

impl fmt::Display for StoreTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Durable key-value table set. Every call is atomic on its own; callers never
/// need multi-table transactions. An unusable backend answers every call with
/// [`AppError::StorageUnavailable`].
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, table: StoreTable, key: &str) -> Result<Option<Value>, AppError>;

    /// All records of a table in insertion order.
    async fn get_all(&self, table: StoreTable) -> Result<Vec<Value>, AppError>;

    async fn put(&self, table: StoreTable, key: &str, record: Value) -> Result<(), AppError>;

    async fn delete(&self, table: StoreTable, key: &str) -> Result<(), AppError>;

    async fn clear(&self, table: StoreTable) -> Result<(), AppError>;
}

/// A record type bound to one store table.
pub trait StoredRecord: Serialize + DeserializeOwned + Send + Sync {
    const TABLE: StoreTable;

    fn store_key(&self) -> String;
}

/// Typed view over one table of a [`LocalStore`].
pub struct TypedTable<T> {
    store: Arc<dyn LocalStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for TypedTable<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _marker: PhantomData,
        }
    }
}

impl<T: StoredRecord> TypedTable<T> {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<T>, AppError> {
        match self.store.get(T::TABLE, key).await? {
            Some(value) => Ok(Some(decode::<T>(value)?)),
            None => Ok(None),
        }
    }

    /// Undecodable rows are skipped so one corrupt entry cannot wedge a queue.
    pub async fn get_all(&self) -> Result<Vec<T>, AppError> {
        let rows = self.store.get_all(T::TABLE).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match decode::<T>(row) {
                Ok(record) => records.push(record),
                Err(err) => tracing::warn!(
                    target: "offline::store",
                    table = %T::TABLE,
                    error = %err,
                    "skipping undecodable record"
                ),
            }
        }
        Ok(records)
    }

    pub async fn put(&self, record: &T) -> Result<(), AppError> {
        let value = serde_json::to_value(record)?;
        self.store.put(T::TABLE, &record.store_key(), value).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.store.delete(T::TABLE, key).await
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, AppError> {
    serde_json::from_value(value).map_err(|e| AppError::DeserializationError(e.to_string()))
}
