use crate::domain::value_objects::OfflineFileId;
use tokio::sync::broadcast;

/// Signals broadcast to everything in the process that watches the queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Any queue or cache mutation.
    QueuesChanged,
    /// A new entry was written by a mutation handler; a drain may be due.
    EntryQueued,
    /// The blob transfer of a file was confirmed and checkpointed.
    UploadCheckpointed { file_id: OfflineFileId },
    /// The backend refused work because the account hit a usage limit.
    UsageLimitReached {
        file_id: Option<OfflineFileId>,
        message: String,
    },
    DrainFinished { synced: u32, failed: u32 },
}

#[derive(Clone)]
pub struct SyncEventBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl SyncEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event: SyncEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!(target: "offline::events", "no sync event subscribers");
        }
    }

    pub fn queues_changed(&self) {
        self.publish(SyncEvent::QueuesChanged);
    }
}

impl Default for SyncEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
