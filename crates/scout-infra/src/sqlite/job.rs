//! SQLite job store implementation.
//!
//! Implements `JobStore` from scout-core using sqlx with split read/write
//! pools. Logs and candidate links are stored as JSON text columns; update
//! merges go through the shared `apply_update` so every backing enforces
//! the same invariants. The single-connection writer pool serializes the
//! read-modify-write update cycle, giving per-key atomicity.

use chrono::{DateTime, Utc};
use sqlx::Row;

use scout_core::job::{apply_update, JobStore, UpdateOutcome};
use scout_types::error::RepositoryError;
use scout_types::job::{JobLogEntry, JobRecord, JobStatus, JobUpdate, LogKind};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `JobStore`.
pub struct SqliteJobStore {
    pool: DatabasePool,
}

impl SqliteJobStore {
    /// Create a new job store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: &str) -> Result<Option<JobRecord>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| JobRow::from_row(&row)?.into_record())
            .transpose()
    }

    async fn write(&self, record: &JobRecord) -> Result<(), RepositoryError> {
        let logs = serde_json::to_string(&record.logs)
            .map_err(|e| RepositoryError::Query(format!("failed to serialize logs: {e}")))?;
        let links = serde_json::to_string(&record.candidate_links)
            .map_err(|e| RepositoryError::Query(format!("failed to serialize links: {e}")))?;
        let plan = record
            .plan
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("failed to serialize plan: {e}")))?;
        let result = record
            .result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("failed to serialize result: {e}")))?;

        sqlx::query(
            r#"INSERT INTO jobs (id, owner, plan, status, progress, logs, result, candidate_links, error, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (id) DO UPDATE SET
                 status = excluded.status,
                 progress = excluded.progress,
                 logs = excluded.logs,
                 result = excluded.result,
                 candidate_links = excluded.candidate_links,
                 error = excluded.error,
                 updated_at = excluded.updated_at"#,
        )
        .bind(&record.id)
        .bind(&record.owner)
        .bind(plan)
        .bind(record.status.to_string())
        .bind(record.progress as i64)
        .bind(logs)
        .bind(result)
        .bind(links)
        .bind(&record.error)
        .bind(format_datetime(&record.created_at))
        .bind(format_datetime(&record.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Private row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct JobRow {
    id: String,
    owner: Option<String>,
    plan: Option<String>,
    status: String,
    progress: i64,
    logs: String,
    result: Option<String>,
    candidate_links: String,
    error: Option<String>,
    created_at: String,
    updated_at: String,
}

impl JobRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, RepositoryError> {
        let get = |e: sqlx::Error| RepositoryError::Query(e.to_string());
        Ok(Self {
            id: row.try_get("id").map_err(get)?,
            owner: row.try_get("owner").map_err(get)?,
            plan: row.try_get("plan").map_err(get)?,
            status: row.try_get("status").map_err(get)?,
            progress: row.try_get("progress").map_err(get)?,
            logs: row.try_get("logs").map_err(get)?,
            result: row.try_get("result").map_err(get)?,
            candidate_links: row.try_get("candidate_links").map_err(get)?,
            error: row.try_get("error").map_err(get)?,
            created_at: row.try_get("created_at").map_err(get)?,
            updated_at: row.try_get("updated_at").map_err(get)?,
        })
    }

    fn into_record(self) -> Result<JobRecord, RepositoryError> {
        let status: JobStatus = self
            .status
            .parse()
            .map_err(RepositoryError::Query)?;
        let logs: Vec<JobLogEntry> = serde_json::from_str(&self.logs)
            .map_err(|e| RepositoryError::Query(format!("invalid logs JSON: {e}")))?;
        let candidate_links = serde_json::from_str(&self.candidate_links)
            .map_err(|e| RepositoryError::Query(format!("invalid links JSON: {e}")))?;
        let plan = self
            .plan
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("invalid plan JSON: {e}")))?;
        let result = self
            .result
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("invalid result JSON: {e}")))?;

        Ok(JobRecord {
            id: self.id,
            owner: self.owner,
            plan,
            status,
            progress: self.progress.clamp(0, 100) as u8,
            logs,
            result,
            candidate_links,
            error: self.error,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// JobStore implementation
// ---------------------------------------------------------------------------

impl JobStore for SqliteJobStore {
    async fn create(
        &self,
        id: &str,
        owner: Option<String>,
        plan: Option<serde_json::Value>,
    ) -> Result<JobRecord, RepositoryError> {
        if self.fetch(id).await?.is_some() {
            return Err(RepositoryError::Conflict(format!(
                "job '{id}' already exists"
            )));
        }
        let record = JobRecord::new(id, owner, plan);
        self.write(&record).await?;
        Ok(record)
    }

    async fn update(&self, id: &str, update: JobUpdate) -> Result<JobRecord, RepositoryError> {
        let mut record = self.fetch(id).await?.ok_or(RepositoryError::NotFound)?;
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
        let Some(mut record) = self.fetch(id).await? else {
            return Ok(());
        };
        record.logs.push(JobLogEntry::now(kind, message));
        record.updated_at = Utc::now();
        self.write(&record).await
    }

    async fn get(&self, id: &str) -> Result<Option<JobRecord>, RepositoryError> {
        self.fetch(id).await
    }

    async fn list_incomplete(&self) -> Result<Vec<JobRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM jobs WHERE status NOT IN ('completed', 'failed', 'cancelled') ORDER BY created_at",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| JobRow::from_row(row)?.into_record())
            .collect()
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<JobRecord>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM jobs ORDER BY created_at DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| JobRow::from_row(row)?.into_record())
            .collect()
    }
}
