pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::ports::{CrossTabLock, LocalStore, RemoteApi, RemoteError, StoreTable};
pub use application::services::{
    CacheMirror, ConnectivityEdge, ConnectivityMonitor, EnqueueOutcome, ProgressNotifier,
    SyncCoordinator, SyncEvent, SyncEventBus, SyncQueues,
};
pub use domain::entities::offline::{
    DrainOutcome, DrainReport, DrainTrigger, OfflineFile, OfflineFileDraft, ProgressSnapshot,
    ProgressStatus,
};
pub use infrastructure::database::ConnectionPool;
pub use infrastructure::offline::{
    MemoryLocalStore, NoopSyncLock, SqliteLeaseLock, SqliteLocalStore, UnavailableLocalStore,
    open_local_store,
};
pub use infrastructure::remote::HttpRemoteApi;
pub use shared::{AppConfig, AppError};
pub use state::SyncEngine;

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter; a second call is a no-op.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline=debug,offline_sync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
