use super::degrade;
use crate::application::ports::local_store::{LocalStore, StoreTable, StoredRecord, TypedTable};
use crate::application::services::sync_events::{SyncEvent, SyncEventBus};
use crate::domain::entities::offline::{ColumnAction, PendingDeletion, ProjectAction, RecordAction};
use crate::domain::value_objects::ActionType;
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::Arc;

/// A pending mutation keyed by its target entity; a later write for the same
/// entity replaces the earlier one.
pub trait QueuedAction: StoredRecord + Clone + Debug {
    fn action_type(&self) -> ActionType;

    fn queued_at(&self) -> DateTime<Utc>;

    fn record_error(&mut self, message: String);
}

macro_rules! queued_action {
    ($ty:ty, $table:expr, |$this:ident| $action:expr) => {
        impl StoredRecord for $ty {
            const TABLE: StoreTable = $table;

            fn store_key(&self) -> String {
                self.id.to_string()
            }
        }

        impl QueuedAction for $ty {
            fn action_type(&self) -> ActionType {
                let $this = self;
                $action
            }

            fn queued_at(&self) -> DateTime<Utc> {
                self.queued_at
            }

            fn record_error(&mut self, message: String) {
                self.last_error = Some(message);
            }
        }
    };
}

queued_action!(ProjectAction, StoreTable::PendingProjectActions, |this| this.action);
queued_action!(ColumnAction, StoreTable::PendingColumnActions, |this| this.action);
queued_action!(RecordAction, StoreTable::PendingRecordActions, |this| this.action);
queued_action!(PendingDeletion, StoreTable::PendingDeletions, |_this| ActionType::Delete);

pub type ProjectActionQueue = ActionQueue<ProjectAction>;
pub type ColumnActionQueue = ActionQueue<ColumnAction>;
pub type RecordActionQueue = ActionQueue<RecordAction>;
pub type RecordDeletionQueue = ActionQueue<PendingDeletion>;

pub struct ActionQueue<A> {
    table: TypedTable<A>,
    bus: SyncEventBus,
}

impl<A: QueuedAction> ActionQueue<A> {
    pub fn new(store: Arc<dyn LocalStore>, bus: SyncEventBus) -> Self {
        Self {
            table: TypedTable::new(store),
            bus,
        }
    }

    /// Returns `false` when there is no offline storage to write to.
    pub async fn enqueue(&self, action: A) -> Result<bool, AppError> {
        match self.table.put(&action).await {
            Ok(()) => {}
            Err(AppError::StorageUnavailable(reason)) => {
                tracing::warn!(
                    target: "offline::queue",
                    table = %A::TABLE,
                    reason = %reason,
                    "local store unavailable; action not queued"
                );
                return Ok(false);
            }
            Err(err) => return Err(err),
        }

        tracing::debug!(
            target: "offline::queue",
            table = %A::TABLE,
            key = %action.store_key(),
            action = %action.action_type(),
            "action queued"
        );
        self.bus.queues_changed();
        self.bus.publish(SyncEvent::EntryQueued);
        Ok(true)
    }

    pub async fn list_pending(&self) -> Result<Vec<A>, AppError> {
        degrade(self.table.get_all().await, "list_pending_actions")
    }

    pub async fn len(&self) -> Result<usize, AppError> {
        Ok(self.list_pending().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, AppError> {
        Ok(self.len().await? == 0)
    }

    pub async fn remove(&self, key: &str) -> Result<(), AppError> {
        self.table.delete(key).await?;
        self.bus.queues_changed();
        Ok(())
    }

    /// Removes the entry only if it was not replaced by a newer write since
    /// `replayed` was read. Returns whether it was removed.
    pub async fn remove_if_unchanged(&self, replayed: &A) -> Result<bool, AppError> {
        let key = replayed.store_key();
        match self.table.get(&key).await? {
            Some(current) if current.queued_at() == replayed.queued_at() => {
                self.remove(&key).await?;
                Ok(true)
            }
            Some(_) => {
                tracing::debug!(
                    target: "offline::queue",
                    table = %A::TABLE,
                    key = %key,
                    "action replaced while replaying; keeping newer write"
                );
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Writes back an entry (e.g. with a recorded error) unless it was replaced.
    pub async fn save_if_unchanged(&self, action: &A) -> Result<(), AppError> {
        let key = action.store_key();
        if let Some(current) = self.table.get(&key).await?
            && current.queued_at() == action.queued_at()
        {
            self.table.put(action).await?;
            self.bus.queues_changed();
        }
        Ok(())
    }
}
