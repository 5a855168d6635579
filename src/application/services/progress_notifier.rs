use super::connectivity_monitor::ConnectivityMonitor;
use super::queues::SyncQueues;
use super::sync_events::SyncEventBus;
use crate::domain::entities::offline::{ProgressSnapshot, ProgressStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast::error::RecvError, watch};
use tokio::time::Instant;

/// Derives the UI-facing sync status from queue counts and connectivity.
///
/// Status moves to [`ProgressStatus::Complete`] when work drains to zero and
/// falls back to [`ProgressStatus::Idle`] after `complete_display` elapses.
pub struct ProgressNotifier {
    queues: SyncQueues,
    monitor: Arc<ConnectivityMonitor>,
    bus: SyncEventBus,
    status: watch::Sender<ProgressStatus>,
    complete_display: Duration,
}

impl ProgressNotifier {
    pub fn new(
        queues: SyncQueues,
        monitor: Arc<ConnectivityMonitor>,
        bus: SyncEventBus,
        complete_display: Duration,
    ) -> Self {
        let (status, _) = watch::channel(ProgressStatus::Idle);
        Self {
            queues,
            monitor,
            bus,
            status,
            complete_display,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> ProgressStatus {
        *self.status.borrow()
    }

    /// Recounts the queues and publishes the resulting status.
    pub async fn refresh(&self) -> ProgressStatus {
        let snapshot = match self.queues.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(target: "offline::progress", error = %err, "failed to count queues");
                ProgressSnapshot::default()
            }
        };
        let next = next_status(self.status(), snapshot, self.monitor.is_online());
        self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                tracing::debug!(target: "offline::progress", status = ?next, "sync progress changed");
                *current = next;
                true
            }
        });
        next
    }

    /// Ends the completion window.
    pub fn clear_complete(&self) {
        self.status.send_if_modified(|current| {
            if *current == ProgressStatus::Complete {
                *current = ProgressStatus::Idle;
                true
            } else {
                false
            }
        });
    }

    /// Recomputes on every sync event and connectivity change until the bus closes.
    pub async fn run(self: Arc<Self>) {
        let mut events = self.bus.subscribe();
        let mut online = self.monitor.watch_state();
        let mut deadline: Option<Instant> = None;
        self.apply(&mut deadline).await;

        loop {
            tokio::select! {
                event = events.recv() => {
                    if let Err(RecvError::Closed) = event {
                        break;
                    }
                }
                changed = online.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = sleep_until(deadline) => {
                    deadline = None;
                    self.clear_complete();
                    continue;
                }
            }
            self.apply(&mut deadline).await;
        }
    }

    async fn apply(&self, deadline: &mut Option<Instant>) {
        let before = self.status();
        let after = self.refresh().await;
        if after == ProgressStatus::Complete {
            if before != ProgressStatus::Complete {
                *deadline = Some(Instant::now() + self.complete_display);
            }
        } else {
            *deadline = None;
        }
    }
}

fn next_status(
    previous: ProgressStatus,
    snapshot: ProgressSnapshot,
    online: bool,
) -> ProgressStatus {
    if !snapshot.is_empty() {
        return if online {
            ProgressStatus::Syncing {
                pending: snapshot.pending_files + snapshot.failed_files + snapshot.pending_actions,
                in_flight: snapshot.syncing_files,
            }
        } else {
            ProgressStatus::WaitingForConnection {
                pending: snapshot.total(),
            }
        };
    }
    match previous {
        ProgressStatus::Syncing { .. } | ProgressStatus::WaitingForConnection { .. } => {
            ProgressStatus::Complete
        }
        other => other,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
