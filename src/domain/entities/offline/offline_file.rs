use crate::domain::value_objects::{FileStatus, OfflineFileId, ProjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub original_name: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Input for queueing a new file upload.
#[derive(Debug, Clone)]
pub struct OfflineFileDraft {
    pub project_id: ProjectId,
    pub original_name: String,
    pub mime_type: String,
    pub blob: Vec<u8>,
}

impl OfflineFileDraft {
    pub fn new(
        project_id: ProjectId,
        original_name: impl Into<String>,
        mime_type: impl Into<String>,
        blob: Vec<u8>,
    ) -> Self {
        Self {
            project_id,
            original_name: original_name.into(),
            mime_type: mime_type.into(),
            blob,
        }
    }

    pub fn dedup_key(&self) -> String {
        dedup_key(&self.project_id, &self.original_name, self.blob.len())
    }
}

/// A file upload persisted while offline.
///
/// `uploaded_to_s3` is the idempotency checkpoint: once it is `true` the blob is
/// never transferred again and only the analysis trigger may be retried.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OfflineFile {
    pub id: OfflineFileId,
    #[serde(with = "blob_base64")]
    pub blob: Vec<u8>,
    pub project_id: ProjectId,
    pub status: FileStatus,
    #[serde(rename = "uploadedToS3", default)]
    pub uploaded_to_s3: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_filename: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: FileMetadata,
}

impl OfflineFile {
    pub fn from_draft(draft: OfflineFileDraft) -> Self {
        let now = Utc::now();
        Self {
            id: OfflineFileId::generate(),
            blob: draft.blob,
            project_id: draft.project_id,
            status: FileStatus::Pending,
            uploaded_to_s3: false,
            stored_filename: None,
            created_at: now,
            updated_at: now,
            metadata: FileMetadata {
                original_name: draft.original_name,
                mime_type: draft.mime_type,
                error: None,
            },
        }
    }

    pub fn byte_size(&self) -> usize {
        self.blob.len()
    }

    pub fn dedup_key(&self) -> String {
        dedup_key(&self.project_id, &self.metadata.original_name, self.blob.len())
    }

    pub fn original_name(&self) -> &str {
        &self.metadata.original_name
    }

    pub fn mime_type(&self) -> &str {
        &self.metadata.mime_type
    }

    pub fn mark_syncing(&mut self) {
        self.status = FileStatus::Syncing;
        self.metadata.error = None;
        self.touch();
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = FileStatus::Failed;
        self.metadata.error = Some(error.into());
        self.touch();
    }

    /// Records the completed object-storage transfer.
    pub fn mark_uploaded(&mut self, stored_filename: String) {
        self.uploaded_to_s3 = true;
        self.stored_filename = Some(stored_filename);
        self.touch();
    }

    pub fn reset_to_pending(&mut self) {
        self.status = FileStatus::Pending;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn dedup_key(project_id: &ProjectId, original_name: &str, byte_size: usize) -> String {
    format!("{project_id}:{original_name}:{byte_size}")
}

mod blob_base64 {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OfflineFile {
        OfflineFile::from_draft(OfflineFileDraft::new(
            ProjectId::new("P1".into()).unwrap(),
            "invoice.pdf",
            "application/pdf",
            vec![7u8; 2048],
        ))
    }

    #[test]
    fn new_file_starts_pending_without_checkpoint() {
        let file = sample();
        assert_eq!(file.status, FileStatus::Pending);
        assert!(!file.uploaded_to_s3);
        assert_eq!(file.byte_size(), 2048);
        assert_eq!(file.dedup_key(), "P1:invoice.pdf:2048");
    }

    #[test]
    fn persisted_layout_uses_camel_case_and_base64_blob() {
        let mut file = sample();
        file.mark_uploaded("stored/invoice.pdf".into());
        let value = serde_json::to_value(&file).unwrap();

        assert_eq!(value["uploadedToS3"], serde_json::json!(true));
        assert_eq!(value["projectId"], serde_json::json!("P1"));
        assert_eq!(value["metadata"]["originalName"], serde_json::json!("invoice.pdf"));
        assert!(value["blob"].is_string());

        let restored: OfflineFile = serde_json::from_value(value).unwrap();
        assert_eq!(restored, file);
    }

    #[test]
    fn failure_records_error_and_syncing_clears_it() {
        let mut file = sample();
        file.mark_failed("presign failed");
        assert_eq!(file.status, FileStatus::Failed);
        assert_eq!(file.metadata.error.as_deref(), Some("presign failed"));

        file.mark_syncing();
        assert_eq!(file.status, FileStatus::Syncing);
        assert!(file.metadata.error.is_none());
    }
}
