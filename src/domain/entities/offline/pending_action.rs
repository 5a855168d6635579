use crate::domain::value_objects::{ActionPayload, ActionType, EntityId, ProjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pending mutation of a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAction {
    pub id: ProjectId,
    #[serde(rename = "type")]
    pub action: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ActionPayload>,
    pub queued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ProjectAction {
    pub fn update(id: ProjectId, data: ActionPayload) -> Self {
        Self {
            id,
            action: ActionType::Update,
            data: Some(data),
            queued_at: Utc::now(),
            last_error: None,
        }
    }

    pub fn delete(id: ProjectId) -> Self {
        Self {
            id,
            action: ActionType::Delete,
            data: None,
            queued_at: Utc::now(),
            last_error: None,
        }
    }
}

/// Pending mutation of a column; columns always belong to a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnAction {
    pub id: EntityId,
    pub project_id: ProjectId,
    #[serde(rename = "type")]
    pub action: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ActionPayload>,
    pub queued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ColumnAction {
    pub fn update(id: EntityId, project_id: ProjectId, data: ActionPayload) -> Self {
        Self {
            id,
            project_id,
            action: ActionType::Update,
            data: Some(data),
            queued_at: Utc::now(),
            last_error: None,
        }
    }

    pub fn delete(id: EntityId, project_id: ProjectId) -> Self {
        Self {
            id,
            project_id,
            action: ActionType::Delete,
            data: None,
            queued_at: Utc::now(),
            last_error: None,
        }
    }
}

/// Pending mutation of a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordAction {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub action: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ActionPayload>,
    pub queued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl RecordAction {
    pub fn update(id: EntityId, data: ActionPayload) -> Self {
        Self {
            id,
            action: ActionType::Update,
            data: Some(data),
            queued_at: Utc::now(),
            last_error: None,
        }
    }

    pub fn delete(id: EntityId) -> Self {
        Self {
            id,
            action: ActionType::Delete,
            data: None,
            queued_at: Utc::now(),
            last_error: None,
        }
    }
}

/// Record deletion from the older single-purpose deletion queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingDeletion {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    pub queued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl PendingDeletion {
    pub fn new(id: EntityId, project_id: Option<ProjectId>) -> Self {
        Self {
            id,
            project_id,
            queued_at: Utc::now(),
            last_error: None,
        }
    }
}
