use super::{KeyedMutex, degrade};
use crate::application::ports::local_store::{LocalStore, StoreTable, StoredRecord, TypedTable};
use crate::application::services::sync_events::{SyncEvent, SyncEventBus};
use crate::domain::entities::offline::{OfflineFile, OfflineFileDraft};
use crate::domain::value_objects::{FileStatus, OfflineFileId};
use crate::shared::error::AppError;
use std::sync::Arc;

impl StoredRecord for OfflineFile {
    const TABLE: StoreTable = StoreTable::OfflineFiles;

    fn store_key(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued(OfflineFileId),
    /// Same project, name and size already queued; carries the existing id.
    Duplicate(OfflineFileId),
    /// No offline storage in this environment; nothing was queued.
    Unavailable,
}

impl EnqueueOutcome {
    pub fn file_id(&self) -> Option<&OfflineFileId> {
        match self {
            EnqueueOutcome::Queued(id) | EnqueueOutcome::Duplicate(id) => Some(id),
            EnqueueOutcome::Unavailable => None,
        }
    }
}

pub struct FileUploadQueue {
    table: TypedTable<OfflineFile>,
    bus: SyncEventBus,
    enqueue_locks: KeyedMutex,
}

impl FileUploadQueue {
    pub fn new(store: Arc<dyn LocalStore>, bus: SyncEventBus) -> Self {
        Self {
            table: TypedTable::new(store),
            bus,
            enqueue_locks: KeyedMutex::new(),
        }
    }

    /// Queues a file unless one with the same project, name and size is already
    /// queued. Concurrent calls for the same logical file are serialized so only
    /// one of them can pass the duplicate check.
    pub async fn enqueue(&self, draft: OfflineFileDraft) -> Result<EnqueueOutcome, AppError> {
        let dedup_key = draft.dedup_key();
        let _guard = self.enqueue_locks.lock(dedup_key.clone()).await;

        let existing = match self.table.get_all().await {
            Ok(files) => files,
            Err(AppError::StorageUnavailable(reason)) => {
                tracing::warn!(
                    target: "offline::queue",
                    reason = %reason,
                    "local store unavailable; file not queued"
                );
                return Ok(EnqueueOutcome::Unavailable);
            }
            Err(err) => return Err(err),
        };

        if let Some(duplicate) = existing.iter().find(|f| f.dedup_key() == dedup_key) {
            tracing::debug!(
                target: "offline::queue",
                file_id = %duplicate.id,
                key = %dedup_key,
                "duplicate file enqueue ignored"
            );
            return Ok(EnqueueOutcome::Duplicate(duplicate.id.clone()));
        }

        let file = OfflineFile::from_draft(draft);
        match self.table.put(&file).await {
            Ok(()) => {}
            Err(AppError::StorageUnavailable(_)) => return Ok(EnqueueOutcome::Unavailable),
            Err(err) => return Err(err),
        }

        tracing::info!(
            target: "offline::queue",
            file_id = %file.id,
            project_id = %file.project_id,
            bytes = file.byte_size(),
            "file queued for upload"
        );
        self.bus.queues_changed();
        self.bus.publish(SyncEvent::EntryQueued);
        Ok(EnqueueOutcome::Queued(file.id))
    }

    /// Files a drain may process: `pending` and `failed`, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<OfflineFile>, AppError> {
        let files = self.sorted(|status| status.is_drainable()).await;
        degrade(files, "list_pending_files")
    }

    /// Files left in `syncing`, typically by an instance that died mid-upload.
    pub async fn list_syncing(&self) -> Result<Vec<OfflineFile>, AppError> {
        let files = self.sorted(|status| status == FileStatus::Syncing).await;
        degrade(files, "list_syncing_files")
    }

    pub async fn all(&self) -> Result<Vec<OfflineFile>, AppError> {
        degrade(self.table.get_all().await, "list_files")
    }

    pub async fn get(&self, id: &OfflineFileId) -> Result<Option<OfflineFile>, AppError> {
        self.table.get(id.as_str()).await
    }

    /// Persists a status transition of an existing entry.
    pub async fn save(&self, file: &OfflineFile) -> Result<(), AppError> {
        self.table.put(file).await?;
        self.bus.queues_changed();
        Ok(())
    }

    pub async fn remove(&self, id: &OfflineFileId) -> Result<(), AppError> {
        self.table.delete(id.as_str()).await?;
        self.bus.queues_changed();
        Ok(())
    }

    async fn sorted(
        &self,
        keep: impl Fn(FileStatus) -> bool,
    ) -> Result<Vec<OfflineFile>, AppError> {
        let mut files: Vec<OfflineFile> = self
            .table
            .get_all()
            .await?
            .into_iter()
            .filter(|f| keep(f.status))
            .collect();
        files.sort_by_key(|f| f.created_at);
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::ProjectId;
    use crate::infrastructure::offline::{MemoryLocalStore, UnavailableLocalStore};
    use async_trait::async_trait;
    use serde_json::Value;

    /// Yields before every call so concurrent enqueues really interleave.
    struct YieldingStore(MemoryLocalStore);

    #[async_trait]
    impl LocalStore for YieldingStore {
        async fn get(&self, table: StoreTable, key: &str) -> Result<Option<Value>, AppError> {
            tokio::task::yield_now().await;
            self.0.get(table, key).await
        }

        async fn get_all(&self, table: StoreTable) -> Result<Vec<Value>, AppError> {
            tokio::task::yield_now().await;
            self.0.get_all(table).await
        }

        async fn put(&self, table: StoreTable, key: &str, record: Value) -> Result<(), AppError> {
            tokio::task::yield_now().await;
            self.0.put(table, key, record).await
        }

        async fn delete(&self, table: StoreTable, key: &str) -> Result<(), AppError> {
            tokio::task::yield_now().await;
            self.0.delete(table, key).await
        }

        async fn clear(&self, table: StoreTable) -> Result<(), AppError> {
            self.0.clear(table).await
        }
    }

    fn draft(name: &str, size: usize) -> OfflineFileDraft {
        OfflineFileDraft::new(
            ProjectId::new("P1".into()).unwrap(),
            name,
            "application/pdf",
            vec![1u8; size],
        )
    }

    fn queue_over(store: Arc<dyn LocalStore>) -> FileUploadQueue {
        FileUploadQueue::new(store, SyncEventBus::new(16))
    }

    #[tokio::test]
    async fn sequential_duplicate_returns_existing_id() {
        let queue = queue_over(Arc::new(MemoryLocalStore::new()));

        let first = queue.enqueue(draft("invoice.pdf", 2048)).await.unwrap();
        let second = queue.enqueue(draft("invoice.pdf", 2048)).await.unwrap();

        let EnqueueOutcome::Queued(id) = first else {
            panic!("first enqueue should queue");
        };
        assert_eq!(second, EnqueueOutcome::Duplicate(id));
        assert_eq!(queue.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_duplicates_store_one_entry() {
        let queue = queue_over(Arc::new(YieldingStore(MemoryLocalStore::new())));

        let (a, b) = tokio::join!(
            queue.enqueue(draft("invoice.pdf", 2048)),
            queue.enqueue(draft("invoice.pdf", 2048))
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(queue.all().await.unwrap().len(), 1);
        assert_eq!(a.file_id(), b.file_id());
        assert!(matches!(
            (&a, &b),
            (EnqueueOutcome::Queued(_), EnqueueOutcome::Duplicate(_))
                | (EnqueueOutcome::Duplicate(_), EnqueueOutcome::Queued(_))
        ));
    }

    #[tokio::test]
    async fn same_name_with_different_size_is_not_a_duplicate() {
        let queue = queue_over(Arc::new(MemoryLocalStore::new()));

        queue.enqueue(draft("invoice.pdf", 2048)).await.unwrap();
        let other = queue.enqueue(draft("invoice.pdf", 4096)).await.unwrap();

        assert!(matches!(other, EnqueueOutcome::Queued(_)));
        assert_eq!(queue.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn syncing_entries_are_listed_separately() {
        let queue = queue_over(Arc::new(MemoryLocalStore::new()));
        queue.enqueue(draft("a.pdf", 1)).await.unwrap();
        queue.enqueue(draft("b.pdf", 2)).await.unwrap();

        let mut files = queue.list_pending().await.unwrap();
        assert_eq!(files.len(), 2);

        let mut stuck = files.remove(0);
        stuck.mark_syncing();
        queue.save(&stuck).await.unwrap();

        let pending = queue.list_pending().await.unwrap();
        let syncing = queue.list_syncing().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(syncing.len(), 1);
        assert_eq!(syncing[0].id, stuck.id);
    }

    #[tokio::test]
    async fn enqueue_publishes_change_notifications() {
        let bus = SyncEventBus::new(16);
        let mut rx = bus.subscribe();
        let queue = FileUploadQueue::new(Arc::new(MemoryLocalStore::new()), bus);

        queue.enqueue(draft("a.pdf", 3)).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), SyncEvent::QueuesChanged);
        assert_eq!(rx.recv().await.unwrap(), SyncEvent::EntryQueued);
    }

    #[tokio::test]
    async fn unavailable_store_degrades_to_empty_queue() {
        let queue = queue_over(Arc::new(UnavailableLocalStore::new("indexed storage disabled")));

        let outcome = queue.enqueue(draft("a.pdf", 3)).await.unwrap();
        assert_eq!(outcome, EnqueueOutcome::Unavailable);
        assert!(queue.list_pending().await.unwrap().is_empty());
        assert!(queue.list_syncing().await.unwrap().is_empty());
    }
}
