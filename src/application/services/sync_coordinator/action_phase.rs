use super::core::SyncCoordinator;
use crate::application::ports::remote_api::{RemoteApi, RemoteError};
use crate::application::services::cache_mirror::CacheMirror;
use crate::application::services::queues::{ActionQueue, QueuedAction};
use crate::application::services::sync_events::SyncEvent;
use crate::domain::entities::offline::{
    ColumnAction, DrainPhase, PendingDeletion, PhaseReport, ProjectAction, RecordAction,
};
use crate::domain::value_objects::ActionType;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// How a queued action is sent to the backend and reflected in the cache.
#[async_trait]
trait ActionReplay: QueuedAction + 'static {
    async fn replay(&self, remote: &dyn RemoteApi) -> Result<(), RemoteError>;

    /// Drops the deleted entity from the cache mirror.
    async fn prune_cache(&self, _cache: &CacheMirror) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl ActionReplay for ProjectAction {
    async fn replay(&self, remote: &dyn RemoteApi) -> Result<(), RemoteError> {
        remote.mutate_project(&self.id, self.action, self.data.clone()).await
    }

    async fn prune_cache(&self, cache: &CacheMirror) -> Result<(), AppError> {
        cache.forget_project(&self.id).await
    }
}

#[async_trait]
impl ActionReplay for ColumnAction {
    async fn replay(&self, remote: &dyn RemoteApi) -> Result<(), RemoteError> {
        remote
            .mutate_column(&self.id, &self.project_id, self.action, self.data.clone())
            .await
    }
}

#[async_trait]
impl ActionReplay for RecordAction {
    async fn replay(&self, remote: &dyn RemoteApi) -> Result<(), RemoteError> {
        remote.mutate_record(&self.id, self.action, self.data.clone()).await
    }

    async fn prune_cache(&self, cache: &CacheMirror) -> Result<(), AppError> {
        cache.forget_record(self.id.as_str()).await
    }
}

#[async_trait]
impl ActionReplay for PendingDeletion {
    async fn replay(&self, remote: &dyn RemoteApi) -> Result<(), RemoteError> {
        remote.mutate_record(&self.id, ActionType::Delete, None).await
    }

    async fn prune_cache(&self, cache: &CacheMirror) -> Result<(), AppError> {
        cache.forget_record(self.id.as_str()).await
    }
}

impl SyncCoordinator {
    pub(super) async fn drain_action_phase(&self, phase: DrainPhase) -> PhaseReport {
        match phase {
            DrainPhase::ProjectActions => {
                let queue = self.queues.projects.as_ref();
                let mut entries = self.pending(phase, queue).await;
                // Deletes first so updates never target a project about to vanish.
                entries.sort_by_key(|a| a.action != ActionType::Delete);
                self.replay_entries(phase, queue, entries).await
            }
            DrainPhase::ColumnActions => {
                let queue = self.queues.columns.as_ref();
                let entries = self.pending(phase, queue).await;
                self.replay_entries(phase, queue, entries).await
            }
            DrainPhase::RecordUpdates | DrainPhase::RecordDeletions => {
                let wanted = if phase == DrainPhase::RecordUpdates {
                    ActionType::Update
                } else {
                    ActionType::Delete
                };
                let queue = self.queues.records.as_ref();
                let entries = self
                    .pending(phase, queue)
                    .await
                    .into_iter()
                    .filter(|a| a.action == wanted)
                    .collect();
                self.replay_entries(phase, queue, entries).await
            }
            DrainPhase::LegacyDeletions => {
                let queue = self.queues.deletions.as_ref();
                let entries = self.pending(phase, queue).await;
                self.replay_entries(phase, queue, entries).await
            }
            DrainPhase::FileUploads => PhaseReport::new(phase),
        }
    }

    async fn pending<A: QueuedAction>(&self, phase: DrainPhase, queue: &ActionQueue<A>) -> Vec<A> {
        queue.list_pending().await.unwrap_or_else(|err| {
            tracing::warn!(
                target: "offline::sync",
                phase = %phase,
                error = %err,
                "failed to list queued actions"
            );
            Vec::new()
        })
    }

    async fn replay_entries<A: ActionReplay>(
        &self,
        phase: DrainPhase,
        queue: &ActionQueue<A>,
        entries: Vec<A>,
    ) -> PhaseReport {
        let mut report = PhaseReport::new(phase);

        for mut entry in entries {
            if self.lease_lost() {
                report.aborted = true;
                break;
            }
            let key = entry.store_key();
            let result = entry.replay(self.remote.as_ref()).await;
            match result {
                Ok(()) => {
                    self.settle(queue, &entry).await;
                    report.synced += 1;
                }
                Err(RemoteError::NotFound(message)) => {
                    tracing::info!(
                        target: "offline::sync",
                        phase = %phase,
                        key = %key,
                        message = %message,
                        "target no longer exists; purging queued action"
                    );
                    self.settle(queue, &entry).await;
                    report.purged += 1;
                }
                Err(RemoteError::Unauthorized(message)) => {
                    tracing::warn!(
                        target: "offline::sync",
                        phase = %phase,
                        key = %key,
                        message = %message,
                        "session expired; remaining actions in phase deferred"
                    );
                    report.aborted = true;
                    break;
                }
                Err(err) => {
                    tracing::warn!(
                        target: "offline::sync",
                        phase = %phase,
                        key = %key,
                        error = %err,
                        "action replay failed"
                    );
                    if let RemoteError::UsageLimit(message) = &err {
                        self.bus.publish(SyncEvent::UsageLimitReached {
                            file_id: None,
                            message: message.clone(),
                        });
                    }
                    entry.record_error(err.to_string());
                    if let Err(store_err) = queue.save_if_unchanged(&entry).await {
                        tracing::warn!(
                            target: "offline::sync",
                            key = %key,
                            error = %store_err,
                            "failed to record action error"
                        );
                    }
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Removes a finished entry and, for deletes, prunes the cache mirror.
    async fn settle<A: ActionReplay>(&self, queue: &ActionQueue<A>, entry: &A) {
        if let Err(err) = queue.remove_if_unchanged(entry).await {
            tracing::warn!(
                target: "offline::sync",
                key = %entry.store_key(),
                error = %err,
                "failed to remove replayed action"
            );
        }
        if entry.action_type() == ActionType::Delete
            && let Err(err) = entry.prune_cache(&self.cache).await
        {
            tracing::warn!(
                target: "offline::sync",
                key = %entry.store_key(),
                error = %err,
                "failed to prune cache after delete"
            );
        }
    }
}
