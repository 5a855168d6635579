use crate::domain::value_objects::{ActionPayload, ActionType, EntityId, ProjectId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a remote call, classified once at the API boundary.
///
/// - `Unauthorized`: the session expired (HTTP 401); the current phase stops.
/// - `NotFound`: the target (or its owning project) is gone (HTTP 404); the entry is purged.
/// - `UsageLimit`: the account hit a plan limit; surfaced to the user, entry kept.
/// - `Transient`: network failure, 5xx, or an intermediary's HTML error page; retried later.
/// - `Permanent`: any other rejection; the raw message is kept on the entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Usage limit reached: {0}")]
    UsageLimit(String),

    #[error("Temporary server error: {0}")]
    Transient(String),

    #[error("{0}")]
    Permanent(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub upload_url: String,
    pub stored_filename: String,
}

/// Backend operations the coordinator replays queued work against.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn get_presigned_upload_url(
        &self,
        original_name: &str,
        project_id: &ProjectId,
        mime_type: &str,
    ) -> Result<PresignedUpload, RemoteError>;

    /// PUT to object storage; any non-2xx answer is an error.
    async fn upload_binary(
        &self,
        upload_url: &str,
        blob: &[u8],
        mime_type: &str,
    ) -> Result<(), RemoteError>;

    async fn trigger_document_analysis(
        &self,
        project_id: &ProjectId,
        stored_filename: &str,
        original_name: &str,
    ) -> Result<(), RemoteError>;

    async fn mutate_project(
        &self,
        id: &ProjectId,
        action: ActionType,
        data: Option<ActionPayload>,
    ) -> Result<(), RemoteError>;

    async fn mutate_column(
        &self,
        id: &EntityId,
        project_id: &ProjectId,
        action: ActionType,
        data: Option<ActionPayload>,
    ) -> Result<(), RemoteError>;

    async fn mutate_record(
        &self,
        id: &EntityId,
        action: ActionType,
        data: Option<ActionPayload>,
    ) -> Result<(), RemoteError>;
}
