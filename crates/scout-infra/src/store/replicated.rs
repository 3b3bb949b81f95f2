//! Best-effort replicated job store.
//!
//! Wraps a fast primary and a durable secondary behind the single
//! `JobStore` interface the workflow engine sees. The primary write is
//! authoritative: it must succeed before the call returns. Secondary
//! failures are logged at warn and swallowed -- this is deliberate
//! best-effort replication, not a two-phase commit. Reads always come
//! from the primary.

use scout_core::job::JobStore;
use scout_types::error::RepositoryError;
use scout_types::job::{JobRecord, JobUpdate, LogKind};

/// Dual-write `JobStore`: primary is authoritative, secondary best-effort.
pub struct ReplicatedJobStore<P, S> {
    primary: P,
    secondary: S,
}

impl<P: JobStore, S: JobStore> ReplicatedJobStore<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }

    fn shadow<T>(&self, op: &str, id: &str, outcome: Result<T, RepositoryError>) {
        if let Err(e) = outcome {
            tracing::warn!(job_id = id, op, error = %e, "secondary store write failed");
        }
    }
}

impl<P: JobStore, S: JobStore> JobStore for ReplicatedJobStore<P, S> {
    async fn create(
        &self,
        id: &str,
        owner: Option<String>,
        plan: Option<serde_json::Value>,
    ) -> Result<JobRecord, RepositoryError> {
        let record = self.primary.create(id, owner.clone(), plan.clone()).await?;
        self.shadow("create", id, self.secondary.create(id, owner, plan).await);
        Ok(record)
    }

    async fn update(&self, id: &str, update: JobUpdate) -> Result<JobRecord, RepositoryError> {
        let record = self.primary.update(id, update.clone()).await?;
        self.shadow("update", id, self.secondary.update(id, update).await);
        Ok(record)
    }

    async fn append_log(
        &self,
        id: &str,
        kind: LogKind,
        message: &str,
    ) -> Result<(), RepositoryError> {
        self.primary.append_log(id, kind, message).await?;
        self.shadow(
            "append_log",
            id,
            self.secondary.append_log(id, kind, message).await,
        );
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<JobRecord>, RepositoryError> {
        self.primary.get(id).await
    }

    async fn list_incomplete(&self) -> Result<Vec<JobRecord>, RepositoryError> {
        self.primary.list_incomplete().await
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<JobRecord>, RepositoryError> {
        self.primary.list_recent(limit).await
    }
}
