use crate::application::ports::remote_api::RemoteApi;
use crate::application::ports::sync_lock::{CrossTabLock, LockLease};
use crate::application::services::cache_mirror::CacheMirror;
use crate::application::services::connectivity_monitor::{ConnectivityEdge, ConnectivityMonitor};
use crate::application::services::queues::SyncQueues;
use crate::application::services::sync_events::{SyncEvent, SyncEventBus};
use crate::domain::entities::offline::{
    DrainOutcome, DrainPhase, DrainReport, DrainTrigger, PhaseReport, RecoveryReport,
};
use crate::domain::value_objects::OfflineFileId;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Message stored on a file whose analysis trigger hit a temporary server error.
pub const TRANSIENT_RETRY_MESSAGE: &str =
    "Server is temporarily unavailable. The upload will be retried automatically.";

/// Drains every queue against the backend in a fixed phase order.
///
/// At most one drain runs per coordinator, and at most one across instances
/// sharing the same [`CrossTabLock`]. A drain never fails as a whole: per-entry
/// errors are recorded on the entries and summarized in the [`DrainReport`].
pub struct SyncCoordinator {
    pub(super) queues: SyncQueues,
    pub(super) cache: Arc<CacheMirror>,
    pub(super) remote: Arc<dyn RemoteApi>,
    lock: Arc<dyn CrossTabLock>,
    lock_name: String,
    pub(super) bus: SyncEventBus,
    running: AtomicBool,
    lease_lost: Arc<AtomicBool>,
    in_flight: Mutex<HashSet<OfflineFileId>>,
}

impl SyncCoordinator {
    pub fn new(
        queues: SyncQueues,
        cache: Arc<CacheMirror>,
        remote: Arc<dyn RemoteApi>,
        lock: Arc<dyn CrossTabLock>,
        lock_name: impl Into<String>,
        bus: SyncEventBus,
    ) -> Self {
        Self {
            queues,
            cache,
            remote,
            lock,
            lock_name: lock_name.into(),
            bus,
            running: AtomicBool::new(false),
            lease_lost: Arc::new(AtomicBool::new(false)),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub async fn drain(&self, trigger: DrainTrigger) -> DrainOutcome {
        let Some(_running) = RunningGuard::acquire(&self.running) else {
            tracing::debug!(target: "offline::sync", ?trigger, "drain already running; skipped");
            return DrainOutcome::AlreadyRunning;
        };

        let lease = match self.lock.try_acquire(&self.lock_name).await {
            Ok(Some(lease)) => Some(lease),
            Ok(None) => {
                tracing::info!(
                    target: "offline::sync",
                    lock = %self.lock_name,
                    ?trigger,
                    "sync lock held by another instance; drain skipped"
                );
                return DrainOutcome::LockHeldElsewhere;
            }
            Err(err) => {
                tracing::warn!(
                    target: "offline::sync",
                    lock = %self.lock_name,
                    error = %err,
                    "sync lock unavailable; draining without exclusion"
                );
                None
            }
        };

        self.lease_lost.store(false, Ordering::SeqCst);
        let heartbeat = lease.as_ref().and_then(|lease| self.spawn_heartbeat(lease.clone()));

        let started_at = Utc::now();
        tracing::info!(target: "offline::sync", ?trigger, "drain started");

        let recovery = if trigger.runs_recovery() {
            self.recover_interrupted_uploads().await
        } else {
            RecoveryReport::default()
        };

        let mut phases = Vec::with_capacity(DrainPhase::ORDER.len());
        for phase in DrainPhase::ORDER {
            if self.lease_lost() {
                break;
            }
            let report = self.run_phase(phase).await;
            if report.synced + report.failed + report.purged > 0 || report.aborted {
                tracing::debug!(
                    target: "offline::sync",
                    phase = %phase,
                    synced = report.synced,
                    failed = report.failed,
                    purged = report.purged,
                    aborted = report.aborted,
                    "phase finished"
                );
            }
            phases.push(report);
        }

        drop(heartbeat);
        let lease_lost = self.lease_lost();
        if let Some(lease) = lease
            && !lease_lost
        {
            self.release(lease).await;
        }

        let report = DrainReport {
            trigger,
            recovery,
            phases,
            lease_lost,
            started_at,
            finished_at: Utc::now(),
        };
        let (synced, failed) = (report.synced_count(), report.failed_count());
        tracing::info!(
            target: "offline::sync",
            ?trigger,
            synced,
            failed,
            purged = report.purged_count(),
            recovered = recovery.removed + recovery.reset,
            lease_lost,
            "drain finished"
        );
        self.bus.publish(SyncEvent::DrainFinished { synced, failed });
        DrainOutcome::Completed(report)
    }

    /// Drains on startup, on every reconnect, whenever a new entry is queued
    /// while online, and on each `interval` tick while online.
    pub fn spawn_listener(
        self: Arc<Self>,
        monitor: Arc<ConnectivityMonitor>,
        interval: Option<Duration>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut edges = monitor.subscribe_edges();
            let mut events = self.bus.subscribe();
            let mut ticker = interval.filter(|p| !p.is_zero()).map(|period| {
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                ticker
            });

            if monitor.is_online() {
                self.drain(DrainTrigger::Startup).await;
            }

            loop {
                let trigger = tokio::select! {
                    edge = edges.recv() => match edge {
                        Ok(ConnectivityEdge::Reconnected) => Some(DrainTrigger::Reconnect),
                        Ok(ConnectivityEdge::Disconnected) => None,
                        Err(RecvError::Lagged(_)) => {
                            monitor.is_online().then_some(DrainTrigger::Reconnect)
                        }
                        Err(RecvError::Closed) => break,
                    },
                    event = events.recv() => match event {
                        Ok(SyncEvent::EntryQueued) => {
                            monitor.is_online().then_some(DrainTrigger::QueueChanged)
                        }
                        Ok(_) => None,
                        Err(RecvError::Lagged(_)) => {
                            monitor.is_online().then_some(DrainTrigger::QueueChanged)
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = next_tick(&mut ticker) => {
                        monitor.is_online().then_some(DrainTrigger::Interval)
                    }
                };

                if let Some(trigger) = trigger {
                    self.drain(trigger).await;
                }
            }
            tracing::debug!(target: "offline::sync", "sync listener stopped");
        })
    }

    async fn run_phase(&self, phase: DrainPhase) -> PhaseReport {
        match phase {
            DrainPhase::FileUploads => self.drain_files().await,
            action_phase => self.drain_action_phase(action_phase).await,
        }
    }

    /// Keeps `lease` alive while the drain runs. Flags the drain when another
    /// holder has taken the lock over.
    fn spawn_heartbeat(&self, lease: LockLease) -> Option<LeaseHeartbeat> {
        let period = self.lock.renew_every()?;
        let lock = Arc::clone(&self.lock);
        let lost = Arc::clone(&self.lease_lost);
        Some(LeaseHeartbeat(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match lock.renew(&lease).await {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::warn!(
                            target: "offline::lock",
                            lock = %lease.name,
                            "sync lock taken over; stopping drain"
                        );
                        lost.store(true, Ordering::SeqCst);
                        break;
                    }
                    Err(err) => {
                        tracing::warn!(
                            target: "offline::lock",
                            lock = %lease.name,
                            error = %err,
                            "failed to renew sync lock"
                        );
                    }
                }
            }
        })))
    }

    /// Set once the cross-instance lease of the running drain is gone; phases
    /// stop before their next entry.
    pub(super) fn lease_lost(&self) -> bool {
        self.lease_lost.load(Ordering::SeqCst)
    }

    async fn release(&self, lease: LockLease) {
        if let Err(err) = self.lock.release(lease).await {
            tracing::warn!(
                target: "offline::sync",
                lock = %self.lock_name,
                error = %err,
                "failed to release sync lock"
            );
        }
    }

    /// Claims `id` for this drain. `None` when it is already being replayed.
    pub(super) fn claim(&self, id: &OfflineFileId) -> Option<InFlightSlot<'_>> {
        let mut set = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(id.clone()) {
            return None;
        }
        Some(InFlightSlot {
            set: &self.in_flight,
            id: id.clone(),
        })
    }

    pub(super) fn is_in_flight(&self, id: &OfflineFileId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }
}

struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Stops renewing the lease once the drain ends or is dropped.
struct LeaseHeartbeat(JoinHandle<()>);

impl Drop for LeaseHeartbeat {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Removes the file id from the in-flight set on drop, whatever the outcome.
pub(super) struct InFlightSlot<'a> {
    set: &'a Mutex<HashSet<OfflineFileId>>,
    id: OfflineFileId,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
