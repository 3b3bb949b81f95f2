//! JSON-file job store.
//!
//! One flat JSON document per job under a directory. Serves as the
//! best-effort secondary layer behind `ReplicatedJobStore` and as a
//! zero-dependency backing for demos. Writes go through a temp file plus
//! rename so a crash never leaves a half-written record.

use std::path::{Path, PathBuf};

use scout_core::job::{apply_update, JobStore, UpdateOutcome};
use scout_types::error::RepositoryError;
use scout_types::job::{JobLogEntry, JobRecord, JobUpdate, LogKind};

/// Directory-of-JSON-documents implementation of `JobStore`.
pub struct JsonFileJobStore {
    dir: PathBuf,
}

impl JsonFileJobStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| RepositoryError::Query(format!("failed to create job dir: {e}")))?;
        Ok(Self { dir })
    }

    fn path(&self, id: &str) -> PathBuf {
        // Job ids are caller-supplied; keep the filename shell-safe.
        let safe: String = id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    async fn read(&self, path: &Path) -> Result<Option<JobRecord>, RepositoryError> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => {
                let record = serde_json::from_str(&raw)
                    .map_err(|e| RepositoryError::Query(format!("invalid job document: {e}")))?;
                Ok(Some(record))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    async fn write(&self, record: &JobRecord) -> Result<(), RepositoryError> {
        let path = self.path(&record.id);
        let raw = serde_json::to_string_pretty(record)
            .map_err(|e| RepositoryError::Query(format!("failed to serialize job: {e}")))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<JobRecord>, RepositoryError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(record) = self.read(&path).await? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl JobStore for JsonFileJobStore {
    async fn create(
        &self,
        id: &str,
        owner: Option<String>,
        plan: Option<serde_json::Value>,
    ) -> Result<JobRecord, RepositoryError> {
        if self.read(&self.path(id)).await?.is_some() {
            return Err(RepositoryError::Conflict(format!(
                "job '{id}' already exists"
            )));
        }
        let record = JobRecord::new(id, owner, plan);
        self.write(&record).await?;
        Ok(record)
    }

    async fn update(&self, id: &str, update: JobUpdate) -> Result<JobRecord, RepositoryError> {
        let mut record = self
            .read(&self.path(id))
            .await?
            .ok_or(RepositoryError::NotFound)?;
        if apply_update(&mut record, update) == UpdateOutcome::IgnoredTerminal {
            tracing::warn!(job_id = id, "dropped update against terminal job");
            return Ok(record);
        }
        self.write(&record).await?;
        Ok(record)
    }

    async fn append_log(
        &self,
        id: &str,
        kind: LogKind,
        message: &str,
    ) -> Result<(), RepositoryError> {
        let Some(mut record) = self.read(&self.path(id)).await? else {
            return Ok(());
        };
        record.logs.push(JobLogEntry::now(kind, message));
        record.updated_at = chrono::Utc::now();
        self.write(&record).await
    }

    async fn get(&self, id: &str) -> Result<Option<JobRecord>, RepositoryError> {
        self.read(&self.path(id)).await
    }

    async fn list_incomplete(&self) -> Result<Vec<JobRecord>, RepositoryError> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .filter(|r| !r.status.is_terminal())
            .collect())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<JobRecord>, RepositoryError> {
        let mut records = self.all().await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit as usize);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_types::job::JobStatus;

    fn store() -> (tempfile::TempDir, JsonFileJobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileJobStore::new(dir.path().join("jobs")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_create_writes_document() {
        let (_dir, store) = store();
        store.create("j1", None, None).await.unwrap();
        let fetched = store.get("j1").await.unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_and_log_roundtrip() {
        let (_dir, store) = store();
        store.create("j1", None, None).await.unwrap();
        store
            .update("j1", JobUpdate::default().status(JobStatus::Processing).progress(5))
            .await
            .unwrap();
        store.append_log("j1", LogKind::Info, "Job started").await.unwrap();

        let fetched = store.get("j1").await.unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Processing);
        assert_eq!(fetched.logs.len(), 1);
    }

    #[tokio::test]
    async fn test_unsafe_ids_are_sanitized() {
        let (_dir, store) = store();
        store.create("../evil/../id", None, None).await.unwrap();
        // The document lands inside the store directory, not outside it
        let fetched = store.get("../evil/../id").await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn test_list_recent_orders_newest_first() {
        let (_dir, store) = store();
        store.create("old", None, None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.create("new", None, None).await.unwrap();

        let recent = store.list_recent(10).await.unwrap();
        assert_eq!(recent[0].id, "new");
        assert_eq!(recent[1].id, "old");
    }
}
