//! In-memory job store.
//!
//! Backs tests across the workspace and demos without a database. Shares
//! the exact merge semantics of the durable backings via `apply_update`.

use dashmap::DashMap;
use scout_types::error::RepositoryError;
use scout_types::job::{JobLogEntry, JobRecord, JobUpdate, LogKind};

use super::merge::{apply_update, UpdateOutcome};
use super::store::JobStore;

/// DashMap-backed `JobStore` for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: DashMap<String, JobRecord>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryJobStore {
    async fn create(
        &self,
        id: &str,
        owner: Option<String>,
        plan: Option<serde_json::Value>,
    ) -> Result<JobRecord, RepositoryError> {
        if self.jobs.contains_key(id) {
            return Err(RepositoryError::Conflict(format!(
                "job '{id}' already exists"
            )));
        }
        let record = JobRecord::new(id, owner, plan);
        self.jobs.insert(id.to_string(), record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, update: JobUpdate) -> Result<JobRecord, RepositoryError> {
        let mut entry = self.jobs.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if apply_update(entry.value_mut(), update) == UpdateOutcome::IgnoredTerminal {
            tracing::warn!(job_id = id, "dropped update against terminal job");
        }
        Ok(entry.value().clone())
    }

    async fn append_log(
        &self,
        id: &str,
        kind: LogKind,
        message: &str,
    ) -> Result<(), RepositoryError> {
        if let Some(mut entry) = self.jobs.get_mut(id) {
            entry.logs.push(JobLogEntry::now(kind, message));
            entry.updated_at = chrono::Utc::now();
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<JobRecord>, RepositoryError> {
        Ok(self.jobs.get(id).map(|e| e.value().clone()))
    }

    async fn list_incomplete(&self) -> Result<Vec<JobRecord>, RepositoryError> {
        Ok(self
            .jobs
            .iter()
            .filter(|e| !e.status.is_terminal())
            .map(|e| e.value().clone())
            .collect())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<JobRecord>, RepositoryError> {
        let mut all: Vec<JobRecord> = self.jobs.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit as usize);
        Ok(all)
    }
}
