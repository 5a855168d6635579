use super::rows::SyncLockRow;
use crate::application::ports::sync_lock::{CrossTabLock, LockLease};
use crate::infrastructure::database::ConnectionPool;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use uuid::Uuid;

const ACQUIRE_LOCK: &str = r#"
    INSERT INTO sync_locks (name, holder, expires_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(name) DO UPDATE SET
        holder = excluded.holder,
        expires_at = excluded.expires_at
    WHERE sync_locks.expires_at <= ?4 OR sync_locks.holder = excluded.holder
"#;

const RENEW_LOCK: &str = "UPDATE sync_locks SET expires_at = ?3 WHERE name = ?1 AND holder = ?2";

const RELEASE_LOCK: &str = "DELETE FROM sync_locks WHERE name = ?1 AND holder = ?2";

const SELECT_LOCK: &str = "SELECT name, holder, expires_at FROM sync_locks WHERE name = ?1";

/// Lock that always grants; for a single instance per store.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSyncLock;

#[async_trait]
impl CrossTabLock for NoopSyncLock {
    async fn try_acquire(&self, name: &str) -> Result<Option<LockLease>, AppError> {
        Ok(Some(LockLease {
            name: name.to_string(),
            holder: "local".to_string(),
        }))
    }

    async fn renew(&self, _lease: &LockLease) -> Result<bool, AppError> {
        Ok(true)
    }

    async fn release(&self, _lease: LockLease) -> Result<(), AppError> {
        Ok(())
    }
}

/// Lease row in `sync_locks`, shared by every process using the same database.
/// A holder that dies without releasing loses the lock once the lease expires.
pub struct SqliteLeaseLock {
    pool: ConnectionPool,
    holder: String,
    lease: Duration,
}

impl SqliteLeaseLock {
    pub fn new(pool: ConnectionPool, lease: Duration) -> Self {
        Self {
            pool,
            holder: Uuid::new_v4().to_string(),
            lease,
        }
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    fn expiry_from_now(&self) -> (i64, i64) {
        let now = Utc::now().timestamp_millis();
        let lease_ms = i64::try_from(self.lease.as_millis()).unwrap_or(i64::MAX);
        (now, now.saturating_add(lease_ms))
    }

    pub async fn current(&self, name: &str) -> Result<Option<SyncLockRow>, AppError> {
        Ok(sqlx::query_as::<_, SyncLockRow>(SELECT_LOCK)
            .bind(name)
            .fetch_optional(self.pool.get_pool())
            .await?)
    }
}

#[async_trait]
impl CrossTabLock for SqliteLeaseLock {
    async fn try_acquire(&self, name: &str) -> Result<Option<LockLease>, AppError> {
        let (now, expires_at) = self.expiry_from_now();
        let result = sqlx::query(ACQUIRE_LOCK)
            .bind(name)
            .bind(&self.holder)
            .bind(expires_at)
            .bind(now)
            .execute(self.pool.get_pool())
            .await?;

        if result.rows_affected() == 0 {
            if let Some(row) = self.current(name).await? {
                tracing::debug!(
                    target: "offline::lock",
                    lock = %row.name,
                    holder = %row.holder,
                    expires_at = row.expires_at,
                    "sync lock held by another holder"
                );
            }
            return Ok(None);
        }

        Ok(Some(LockLease {
            name: name.to_string(),
            holder: self.holder.clone(),
        }))
    }

    async fn renew(&self, lease: &LockLease) -> Result<bool, AppError> {
        let (_, expires_at) = self.expiry_from_now();
        let result = sqlx::query(RENEW_LOCK)
            .bind(&lease.name)
            .bind(&lease.holder)
            .bind(expires_at)
            .execute(self.pool.get_pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn release(&self, lease: LockLease) -> Result<(), AppError> {
        sqlx::query(RELEASE_LOCK)
            .bind(&lease.name)
            .bind(&lease.holder)
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    /// A third of the lease.
    fn renew_every(&self) -> Option<Duration> {
        (!self.lease.is_zero()).then(|| self.lease / 3)
    }
}
