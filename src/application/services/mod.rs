pub mod cache_mirror;
pub mod connectivity_monitor;
pub mod progress_notifier;
pub mod queues;
pub mod sync_coordinator;
pub mod sync_events;

pub use cache_mirror::CacheMirror;
pub use connectivity_monitor::{ConnectivityEdge, ConnectivityMonitor};
pub use progress_notifier::ProgressNotifier;
pub use queues::{EnqueueOutcome, SyncQueues};
pub use sync_coordinator::SyncCoordinator;
pub use sync_events::{SyncEvent, SyncEventBus};
