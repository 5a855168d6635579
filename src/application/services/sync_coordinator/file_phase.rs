use super::core::{SyncCoordinator, TRANSIENT_RETRY_MESSAGE};
use crate::application::ports::remote_api::RemoteError;
use crate::application::services::sync_events::SyncEvent;
use crate::domain::entities::offline::{
    DrainPhase, OfflineFile, PhaseReport, RecoveryReport,
};

/// Remote step of a file replay, used to pick the stored failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadStep {
    Presign,
    Upload,
    Trigger,
}

impl UploadStep {
    fn as_str(&self) -> &'static str {
        match self {
            UploadStep::Presign => "presign",
            UploadStep::Upload => "upload",
            UploadStep::Trigger => "trigger",
        }
    }
}

enum FileResult {
    Synced,
    Failed,
    Purged,
    Unauthorized,
}

impl SyncCoordinator {
    /// Resolves files left in `syncing` by an interrupted drain: entries whose
    /// blob already reached storage are dropped, the rest go back to `pending`.
    pub(super) async fn recover_interrupted_uploads(&self) -> RecoveryReport {
        let mut report = RecoveryReport::default();
        let stuck = match self.queues.files.list_syncing().await {
            Ok(files) => files,
            Err(err) => {
                tracing::warn!(target: "offline::sync", error = %err, "failed to list syncing files");
                return report;
            }
        };

        for mut file in stuck {
            if self.is_in_flight(&file.id) {
                continue;
            }
            let result = if file.uploaded_to_s3 {
                self.queues.files.remove(&file.id).await.map(|_| report.removed += 1)
            } else {
                file.reset_to_pending();
                self.queues.files.save(&file).await.map(|_| report.reset += 1)
            };
            if let Err(err) = result {
                tracing::warn!(
                    target: "offline::sync",
                    file_id = %file.id,
                    error = %err,
                    "failed to recover interrupted upload"
                );
            }
        }

        if report.removed + report.reset > 0 {
            tracing::info!(
                target: "offline::sync",
                removed = report.removed,
                reset = report.reset,
                "recovered interrupted uploads"
            );
        }
        report
    }

    pub(super) async fn drain_files(&self) -> PhaseReport {
        let mut report = PhaseReport::new(DrainPhase::FileUploads);
        let files = match self.queues.files.list_pending().await {
            Ok(files) => files,
            Err(err) => {
                tracing::warn!(target: "offline::sync", error = %err, "failed to list queued files");
                return report;
            }
        };

        for file in files {
            if self.lease_lost() {
                report.aborted = true;
                break;
            }
            let Some(_slot) = self.claim(&file.id) else {
                continue;
            };
            match self.replay_file(file).await {
                FileResult::Synced => report.synced += 1,
                FileResult::Failed => report.failed += 1,
                FileResult::Purged => report.purged += 1,
                FileResult::Unauthorized => {
                    report.failed += 1;
                    report.aborted = true;
                    tracing::warn!(
                        target: "offline::sync",
                        "session expired; remaining file uploads deferred"
                    );
                    break;
                }
            }
        }
        report
    }

    async fn replay_file(&self, mut file: OfflineFile) -> FileResult {
        file.mark_syncing();
        if let Err(err) = self.queues.files.save(&file).await {
            tracing::warn!(
                target: "offline::sync",
                file_id = %file.id,
                error = %err,
                "failed to mark file as syncing"
            );
            return FileResult::Failed;
        }

        if !file.uploaded_to_s3 {
            let presign = self
                .remote
                .get_presigned_upload_url(file.original_name(), &file.project_id, file.mime_type())
                .await;
            let presigned = match presign {
                Ok(presigned) => presigned,
                Err(err) => return self.fail_file(file, err, UploadStep::Presign).await,
            };

            let upload = self
                .remote
                .upload_binary(&presigned.upload_url, &file.blob, file.mime_type())
                .await;
            if let Err(err) = upload {
                return self.fail_file(file, err, UploadStep::Upload).await;
            }

            // Checkpoint before the trigger so a retry never transfers the blob twice.
            file.mark_uploaded(presigned.stored_filename);
            if let Err(err) = self.queues.files.save(&file).await {
                tracing::warn!(
                    target: "offline::sync",
                    file_id = %file.id,
                    error = %err,
                    "failed to persist upload checkpoint"
                );
            }
            self.bus.publish(SyncEvent::UploadCheckpointed {
                file_id: file.id.clone(),
            });
        }

        let Some(stored_filename) = file.stored_filename.clone() else {
            file.mark_failed("Upload checkpoint is missing the stored filename");
            self.persist_failure(&file).await;
            return FileResult::Failed;
        };

        let trigger = self
            .remote
            .trigger_document_analysis(&file.project_id, &stored_filename, file.original_name())
            .await;
        match trigger {
            Ok(()) => {
                if let Err(err) = self.queues.files.remove(&file.id).await {
                    tracing::warn!(
                        target: "offline::sync",
                        file_id = %file.id,
                        error = %err,
                        "failed to remove synced file"
                    );
                }
                tracing::info!(
                    target: "offline::sync",
                    file_id = %file.id,
                    project_id = %file.project_id,
                    "file synced"
                );
                FileResult::Synced
            }
            Err(err) => self.fail_file(file, err, UploadStep::Trigger).await,
        }
    }

    async fn fail_file(&self, mut file: OfflineFile, err: RemoteError, step: UploadStep) -> FileResult {
        tracing::warn!(
            target: "offline::sync",
            file_id = %file.id,
            step = step.as_str(),
            error = %err,
            "file replay failed"
        );

        let result = match &err {
            // Storage answers for the presigned URL, not for the project.
            RemoteError::NotFound(_) | RemoteError::Unauthorized(_)
                if step == UploadStep::Upload =>
            {
                file.mark_failed(err.to_string());
                FileResult::Failed
            }
            RemoteError::NotFound(_) => {
                if let Err(store_err) = self.queues.files.remove(&file.id).await {
                    tracing::warn!(
                        target: "offline::sync",
                        file_id = %file.id,
                        error = %store_err,
                        "failed to purge orphaned file"
                    );
                }
                return FileResult::Purged;
            }
            RemoteError::Unauthorized(_) => {
                file.mark_failed(err.to_string());
                FileResult::Unauthorized
            }
            RemoteError::UsageLimit(message) => {
                file.mark_failed(message.clone());
                self.bus.publish(SyncEvent::UsageLimitReached {
                    file_id: Some(file.id.clone()),
                    message: message.clone(),
                });
                FileResult::Failed
            }
            RemoteError::Transient(_) if step == UploadStep::Trigger => {
                file.mark_failed(TRANSIENT_RETRY_MESSAGE);
                FileResult::Failed
            }
            other => {
                file.mark_failed(other.to_string());
                FileResult::Failed
            }
        };
        self.persist_failure(&file).await;
        result
    }

    async fn persist_failure(&self, file: &OfflineFile) {
        if let Err(err) = self.queues.files.save(file).await {
            tracing::warn!(
                target: "offline::sync",
                file_id = %file.id,
                error = %err,
                "failed to record file failure"
            );
        }
    }
}
