pub mod action_queue;
pub mod file_upload_queue;
pub mod keyed_mutex;

pub use action_queue::{
    ActionQueue, ColumnActionQueue, ProjectActionQueue, QueuedAction, RecordActionQueue,
    RecordDeletionQueue,
};
pub use file_upload_queue::{EnqueueOutcome, FileUploadQueue};
pub use keyed_mutex::KeyedMutex;

use crate::application::ports::local_store::LocalStore;
use crate::application::services::sync_events::SyncEventBus;
use crate::domain::entities::offline::ProgressSnapshot;
use crate::domain::value_objects::FileStatus;
use crate::shared::error::AppError;
use std::sync::Arc;

/// Every action queue over one local store, shared by mutation handlers, the
/// coordinator and the progress notifier.
#[derive(Clone)]
pub struct SyncQueues {
    pub files: Arc<FileUploadQueue>,
    pub projects: Arc<ProjectActionQueue>,
    pub columns: Arc<ColumnActionQueue>,
    pub records: Arc<RecordActionQueue>,
    pub deletions: Arc<RecordDeletionQueue>,
}

impl SyncQueues {
    pub fn new(store: Arc<dyn LocalStore>, bus: SyncEventBus) -> Self {
        Self {
            files: Arc::new(FileUploadQueue::new(Arc::clone(&store), bus.clone())),
            projects: Arc::new(ActionQueue::new(Arc::clone(&store), bus.clone())),
            columns: Arc::new(ActionQueue::new(Arc::clone(&store), bus.clone())),
            records: Arc::new(ActionQueue::new(Arc::clone(&store), bus.clone())),
            deletions: Arc::new(ActionQueue::new(store, bus)),
        }
    }

    /// Counts across all queues. An unavailable store reads as empty.
    pub async fn snapshot(&self) -> Result<ProgressSnapshot, AppError> {
        let mut snapshot = ProgressSnapshot::default();
        for file in self.files.all().await? {
            match file.status {
                FileStatus::Pending => snapshot.pending_files += 1,
                FileStatus::Syncing => snapshot.syncing_files += 1,
                FileStatus::Failed => snapshot.failed_files += 1,
            }
        }
        snapshot.pending_actions = self.projects.len().await?
            + self.columns.len().await?
            + self.records.len().await?
            + self.deletions.len().await?;
        Ok(snapshot)
    }
}

/// Maps `StorageUnavailable` to an empty result so callers without offline
/// storage behave as if nothing were queued.
pub(crate) fn degrade<T: Default>(
    result: Result<T, AppError>,
    operation: &'static str,
) -> Result<T, AppError> {
    match result {
        Err(AppError::StorageUnavailable(reason)) => {
            tracing::warn!(
                target: "offline::queue",
                operation,
                reason = %reason,
                "local store unavailable; treating queue as empty"
            );
            Ok(T::default())
        }
        other => other,
    }
}
