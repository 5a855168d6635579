use crate::application::ports::local_store::LocalStore;
use crate::application::ports::remote_api::RemoteApi;
use crate::application::ports::sync_lock::CrossTabLock;
use crate::application::services::{
    CacheMirror, ConnectivityEdge, ConnectivityMonitor, ProgressNotifier, SyncCoordinator,
    SyncEventBus, SyncQueues,
};
use crate::domain::entities::offline::{DrainOutcome, DrainTrigger};
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::offline::{NoopSyncLock, SqliteLeaseLock, open_local_store};
use crate::infrastructure::remote::HttpRemoteApi;
use crate::shared::config::AppConfig;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Every offline-sync component wired over one local store.
pub struct SyncEngine {
    pub config: AppConfig,
    pub bus: SyncEventBus,
    pub queues: SyncQueues,
    pub cache: Arc<CacheMirror>,
    pub monitor: Arc<ConnectivityMonitor>,
    pub coordinator: Arc<SyncCoordinator>,
    pub progress: Arc<ProgressNotifier>,
    pool: Option<ConnectionPool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncEngine {
    /// Opens the configured database and talks to the configured backend.
    pub async fn bootstrap(config: AppConfig) -> anyhow::Result<Self> {
        let remote = Arc::new(HttpRemoteApi::new(&config.remote)?);
        Self::bootstrap_with_remote(config, remote).await
    }

    pub async fn bootstrap_with_remote(
        config: AppConfig,
        remote: Arc<dyn RemoteApi>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let opened = open_local_store(&config.database).await;
        let lock: Arc<dyn CrossTabLock> = match &opened.pool {
            Some(pool) => Arc::new(SqliteLeaseLock::new(
                pool.clone(),
                Duration::from_secs(config.sync.lock_lease_secs),
            )),
            None => Arc::new(NoopSyncLock),
        };
        Ok(Self::assemble(config, opened.store, lock, remote, opened.pool))
    }

    pub fn assemble(
        config: AppConfig,
        store: Arc<dyn LocalStore>,
        lock: Arc<dyn CrossTabLock>,
        remote: Arc<dyn RemoteApi>,
        pool: Option<ConnectionPool>,
    ) -> Self {
        let bus = SyncEventBus::new(config.sync.event_capacity);
        let queues = SyncQueues::new(Arc::clone(&store), bus.clone());
        let cache = Arc::new(CacheMirror::new(store, bus.clone()));
        let monitor = Arc::new(ConnectivityMonitor::default());
        let coordinator = Arc::new(SyncCoordinator::new(
            queues.clone(),
            Arc::clone(&cache),
            remote,
            lock,
            config.sync.lock_name.clone(),
            bus.clone(),
        ));
        let progress = Arc::new(ProgressNotifier::new(
            queues.clone(),
            Arc::clone(&monitor),
            bus.clone(),
            Duration::from_millis(config.progress.complete_display_ms),
        ));

        Self {
            config,
            bus,
            queues,
            cache,
            monitor,
            coordinator,
            progress,
            pool,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Starts the progress loop and, with `auto_sync`, the drain listener.
    pub fn spawn_background_tasks(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if !tasks.is_empty() {
            tracing::debug!(target: "offline::engine", "background tasks already running");
            return;
        }

        tasks.push(tokio::spawn(Arc::clone(&self.progress).run()));
        if self.config.sync.auto_sync {
            let interval = Duration::from_secs(self.config.sync.sync_interval);
            tasks.push(
                Arc::clone(&self.coordinator)
                    .spawn_listener(Arc::clone(&self.monitor), Some(interval)),
            );
        }
        tracing::info!(
            target: "offline::engine",
            auto_sync = self.config.sync.auto_sync,
            interval_secs = self.config.sync.sync_interval,
            "offline sync started"
        );
    }

    /// Feeds a connectivity signal from the host environment.
    pub fn set_online(&self, online: bool) -> Option<ConnectivityEdge> {
        self.monitor.set_online(online)
    }

    pub async fn sync_now(&self) -> DrainOutcome {
        self.coordinator.drain(DrainTrigger::Manual).await
    }

    pub async fn shutdown(&self) {
        let tasks: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for task in tasks {
            task.abort();
        }
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
        tracing::info!(target: "offline::engine", "offline sync stopped");
    }
}
