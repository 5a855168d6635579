use crate::shared::error::AppError;
use async_trait::async_trait;
use std::time::Duration;

/// Proof of holding a named advisory lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLease {
    pub name: String,
    pub holder: String,
}

/// Advisory lock shared by every instance that drains the same local store.
#[async_trait]
pub trait CrossTabLock: Send + Sync {
    /// `Ok(None)` when another holder owns the lock. `Err` means the lock
    /// primitive itself is unusable.
    async fn try_acquire(&self, name: &str) -> Result<Option<LockLease>, AppError>;

    /// Extends a held lease. `Ok(false)` when another holder took it over.
    async fn renew(&self, lease: &LockLease) -> Result<bool, AppError>;

    async fn release(&self, lease: LockLease) -> Result<(), AppError>;

    /// How often a held lease has to be renewed; `None` if it never expires.
    fn renew_every(&self) -> Option<Duration> {
        None
    }
}
