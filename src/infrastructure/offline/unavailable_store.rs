use crate::application::ports::local_store::{LocalStore, StoreTable};
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

/// Stand-in used when the local database cannot be opened. Every call fails
/// with [`AppError::StorageUnavailable`].
pub struct UnavailableLocalStore {
    reason: String,
}

impl UnavailableLocalStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> AppError {
        AppError::StorageUnavailable(self.reason.clone())
    }
}

#[async_trait]
impl LocalStore for UnavailableLocalStore {
    async fn get(&self, _table: StoreTable, _key: &str) -> Result<Option<Value>, AppError> {
        Err(self.error())
    }

    async fn get_all(&self, _table: StoreTable) -> Result<Vec<Value>, AppError> {
        Err(self.error())
    }

    async fn put(&self, _table: StoreTable, _key: &str, _record: Value) -> Result<(), AppError> {
        Err(self.error())
    }

    async fn delete(&self, _table: StoreTable, _key: &str) -> Result<(), AppError> {
        Err(self.error())
    }

    async fn clear(&self, _table: StoreTable) -> Result<(), AppError> {
        Err(self.error())
    }
}
