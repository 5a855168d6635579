use crate::domain::value_objects::{OwnerId, ProjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A server-authoritative document (project or record) mirrored locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedDocument {
    pub id: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl CachedDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CachedProjectsEntry {
    pub owner: OwnerId,
    pub data: Vec<CachedDocument>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CachedRecordsEntry {
    pub project_id: ProjectId,
    pub data: Vec<CachedDocument>,
    #[serde(default)]
    pub fields: Vec<Value>,
    pub updated_at: DateTime<Utc>,
}

/// Result of pruning a cached list against the server's id set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PruneResult {
    pub removed: usize,
    pub retained: usize,
}
