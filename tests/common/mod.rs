use async_trait::async_trait;
use offline_sync::application::ports::remote_api::PresignedUpload;
use offline_sync::domain::value_objects::{ActionPayload, ActionType, EntityId, ProjectId};
use offline_sync::{AppConfig, RemoteApi, RemoteError, SyncEngine, SyncEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

/// Remote double that records every call as `kind:detail` and fails the
/// calls registered with [`FakeRemote::fail_on`].
#[derive(Default)]
pub struct FakeRemote {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, RemoteError>>,
}

#[allow(dead_code)]
impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_on(&self, step: &str, key: &str, err: RemoteError) {
        self.failures
            .lock()
            .expect("failures lock")
            .insert(format!("{step}:{key}"), err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: String, step: &str, key: &str) -> Result<(), RemoteError> {
        self.calls.lock().expect("calls lock").push(call);
        match self
            .failures
            .lock()
            .expect("failures lock")
            .get(&format!("{step}:{key}"))
        {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteApi for FakeRemote {
    async fn get_presigned_upload_url(
        &self,
        original_name: &str,
        project_id: &ProjectId,
        mime_type: &str,
    ) -> Result<PresignedUpload, RemoteError> {
        self.record(
            format!("presign:{original_name}:{project_id}:{mime_type}"),
            "presign",
            original_name,
        )?;
        Ok(PresignedUpload {
            upload_url: format!("https://storage.test/{original_name}"),
            stored_filename: format!("uploads/{original_name}"),
        })
    }

    async fn upload_binary(
        &self,
        upload_url: &str,
        blob: &[u8],
        mime_type: &str,
    ) -> Result<(), RemoteError> {
        let name = upload_url.rsplit('/').next().unwrap_or_default().to_string();
        self.record(
            format!("upload:{name}:{}:{mime_type}", blob.len()),
            "upload",
            &name,
        )
    }

    async fn trigger_document_analysis(
        &self,
        project_id: &ProjectId,
        stored_filename: &str,
        original_name: &str,
    ) -> Result<(), RemoteError> {
        self.record(
            format!("trigger:{project_id}:{stored_filename}"),
            "trigger",
            original_name,
        )
    }

    async fn mutate_project(
        &self,
        id: &ProjectId,
        action: ActionType,
        _data: Option<ActionPayload>,
    ) -> Result<(), RemoteError> {
        self.record(format!("project:{action}:{id}"), "project", id.as_str())
    }

    async fn mutate_column(
        &self,
        id: &EntityId,
        project_id: &ProjectId,
        action: ActionType,
        _data: Option<ActionPayload>,
    ) -> Result<(), RemoteError> {
        self.record(format!("column:{action}:{project_id}:{id}"), "column", id.as_str())
    }

    async fn mutate_record(
        &self,
        id: &EntityId,
        action: ActionType,
        _data: Option<ActionPayload>,
    ) -> Result<(), RemoteError> {
        self.record(format!("record:{action}:{id}"), "record", id.as_str())
    }
}

pub fn temp_database() -> (TempDir, String) {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite:{}", dir.path().join("offline.db").display());
    (dir, url)
}

pub fn test_config(database_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = database_url.to_string();
    config.sync.sync_interval = 0;
    config.progress.complete_display_ms = 50;
    config
}

pub async fn engine_at(database_url: &str, remote: Arc<FakeRemote>) -> SyncEngine {
    SyncEngine::bootstrap_with_remote(test_config(database_url), remote)
        .await
        .expect("engine")
}

/// Waits for the next `DrainFinished` and returns `(synced, failed)`.
#[allow(dead_code)]
pub async fn next_drain(events: &mut broadcast::Receiver<SyncEvent>) -> (u32, u32) {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await {
                Ok(SyncEvent::DrainFinished { synced, failed }) => return (synced, failed),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("drain finished in time")
}
