use crate::application::ports::local_store::{LocalStore, StoreTable, StoredRecord, TypedTable};
use crate::application::services::sync_events::SyncEventBus;
use crate::domain::entities::offline::{
    CachedDocument, CachedProjectsEntry, CachedRecordsEntry, PruneResult,
};
use crate::domain::value_objects::{OwnerId, ProjectId};
use crate::shared::error::AppError;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

impl StoredRecord for CachedProjectsEntry {
    const TABLE: StoreTable = StoreTable::CachedProjects;

    fn store_key(&self) -> String {
        self.owner.to_string()
    }
}

impl StoredRecord for CachedRecordsEntry {
    const TABLE: StoreTable = StoreTable::CachedRecords;

    fn store_key(&self) -> String {
        self.project_id.to_string()
    }
}

/// Read-through copy of server-authoritative lists, used to render offline.
pub struct CacheMirror {
    projects: TypedTable<CachedProjectsEntry>,
    records: TypedTable<CachedRecordsEntry>,
    bus: SyncEventBus,
}

impl CacheMirror {
    pub fn new(store: Arc<dyn LocalStore>, bus: SyncEventBus) -> Self {
        Self {
            projects: TypedTable::new(Arc::clone(&store)),
            records: TypedTable::new(store),
            bus,
        }
    }

    pub async fn cache_projects(
        &self,
        owner: &OwnerId,
        projects: Vec<CachedDocument>,
    ) -> Result<(), AppError> {
        self.projects
            .put(&CachedProjectsEntry {
                owner: owner.clone(),
                data: projects,
                updated_at: Utc::now(),
            })
            .await?;
        self.bus.queues_changed();
        Ok(())
    }

    pub async fn cached_projects(&self, owner: &OwnerId) -> Result<Vec<CachedDocument>, AppError> {
        Ok(self
            .projects
            .get(owner.as_str())
            .await?
            .map(|entry| entry.data)
            .unwrap_or_default())
    }

    pub async fn cache_records(
        &self,
        project_id: &ProjectId,
        records: Vec<CachedDocument>,
        fields: Vec<Value>,
    ) -> Result<(), AppError> {
        self.records
            .put(&CachedRecordsEntry {
                project_id: project_id.clone(),
                data: records,
                fields,
                updated_at: Utc::now(),
            })
            .await?;
        self.bus.queues_changed();
        Ok(())
    }

    pub async fn cached_records(
        &self,
        project_id: &ProjectId,
    ) -> Result<Option<CachedRecordsEntry>, AppError> {
        self.records.get(project_id.as_str()).await
    }

    /// Drops cached projects of `owner` that the server no longer lists.
    pub async fn sync_project_deletions(
        &self,
        owner: &OwnerId,
        server_ids: &[String],
    ) -> Result<PruneResult, AppError> {
        let Some(mut entry) = self.projects.get(owner.as_str()).await? else {
            return Ok(PruneResult::default());
        };
        let result = retain_server_ids(&mut entry.data, server_ids);
        if result.removed > 0 {
            entry.updated_at = Utc::now();
            self.projects.put(&entry).await?;
            self.bus.queues_changed();
        }
        tracing::debug!(
            target: "offline::cache",
            owner = %owner,
            removed = result.removed,
            retained = result.retained,
            "pruned cached projects"
        );
        Ok(result)
    }

    /// Drops cached records of `project_id` that the server no longer lists.
    pub async fn sync_record_deletions(
        &self,
        project_id: &ProjectId,
        server_ids: &[String],
    ) -> Result<PruneResult, AppError> {
        let Some(mut entry) = self.records.get(project_id.as_str()).await? else {
            return Ok(PruneResult::default());
        };
        let result = retain_server_ids(&mut entry.data, server_ids);
        if result.removed > 0 {
            entry.updated_at = Utc::now();
            self.records.put(&entry).await?;
            self.bus.queues_changed();
        }
        tracing::debug!(
            target: "offline::cache",
            project_id = %project_id,
            removed = result.removed,
            retained = result.retained,
            "pruned cached records"
        );
        Ok(result)
    }

    /// Removes a project from every cached project list and drops its records.
    pub async fn forget_project(&self, project_id: &ProjectId) -> Result<(), AppError> {
        let mut changed = false;
        for mut entry in self.projects.get_all().await? {
            let before = entry.data.len();
            entry.data.retain(|doc| doc.id != project_id.as_str());
            if entry.data.len() != before {
                entry.updated_at = Utc::now();
                self.projects.put(&entry).await?;
                changed = true;
            }
        }
        if self.records.get(project_id.as_str()).await?.is_some() {
            self.records.delete(project_id.as_str()).await?;
            changed = true;
        }
        if changed {
            self.bus.queues_changed();
        }
        Ok(())
    }

    /// Removes a record from the cached list of every project.
    pub async fn forget_record(&self, record_id: &str) -> Result<(), AppError> {
        let mut changed = false;
        for mut entry in self.records.get_all().await? {
            let before = entry.data.len();
            entry.data.retain(|doc| doc.id != record_id);
            if entry.data.len() != before {
                entry.updated_at = Utc::now();
                self.records.put(&entry).await?;
                changed = true;
            }
        }
        if changed {
            self.bus.queues_changed();
        }
        Ok(())
    }
}

fn retain_server_ids(cached: &mut Vec<CachedDocument>, server_ids: &[String]) -> PruneResult {
    let server: HashSet<&str> = server_ids.iter().map(String::as_str).collect();
    let before = cached.len();
    cached.retain(|doc| server.contains(doc.id.as_str()));
    PruneResult {
        removed: before - cached.len(),
        retained: cached.len(),
    }
}
