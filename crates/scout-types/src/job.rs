//! Job domain types.
//!
//! A job is one durable instance of a research workflow, tracked as a
//! `JobRecord`. The record is the unit the polling UI reads and the only
//! state shared across workflow instances, so it must stay a flat,
//! JSON-serializable document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a job.
///
/// Transitions only move forward along the state machine, with one
/// exception: `WaitingForSelection -> Processing` when the user submits a
/// link selection. `Completed`, `Failed`, and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Queued,
    Processing,
    WaitingForSelection,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Whether this status admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::WaitingForSelection => "waiting_for_selection",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "waiting_for_selection" => Ok(JobStatus::WaitingForSelection),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(format!("unknown job status: '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Log entries
// ---------------------------------------------------------------------------

/// Category of a job log line, rendered by the polling UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogKind {
    Info,
    Step,
    Success,
    Error,
}

/// One append-only log entry on a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobLogEntry {
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl JobLogEntry {
    /// Build an entry stamped with the current time.
    pub fn now(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Candidate links
// ---------------------------------------------------------------------------

/// A search hit offered to the user during the link-selection pause.
///
/// Only present (non-empty) while the job is in `WaitingForSelection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateLink {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

// ---------------------------------------------------------------------------
// Job record
// ---------------------------------------------------------------------------

/// The durable state of one workflow instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Opaque unique identifier, assigned at creation, immutable.
    pub id: String,
    /// Optional opaque reference to the owning user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Flow descriptor persisted at creation, used for restart recovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<serde_json::Value>,
    pub status: JobStatus,
    /// Completion percentage, 0-100, monotonically non-decreasing.
    pub progress: u8,
    /// Append-only log, cleared only by an explicit finalize reset.
    #[serde(default)]
    pub logs: Vec<JobLogEntry>,
    /// Final payload. Non-null iff `status == Completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Links awaiting user selection. Non-empty only in `WaitingForSelection`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidate_links: Vec<CandidateLink>,
    /// Failure (or cancellation) message. Set only in a terminal error state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// A fresh record as produced by `JobStore::create`.
    pub fn new(id: impl Into<String>, owner: Option<String>, plan: Option<serde_json::Value>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            owner,
            plan,
            status: JobStatus::Pending,
            progress: 0,
            logs: Vec::new(),
            result: None,
            candidate_links: Vec::new(),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Partial update
// ---------------------------------------------------------------------------

/// A partial mutation of a `JobRecord`.
///
/// Unset fields are left unchanged by `JobStore::update`. Note that `logs`
/// here is a wholesale replacement (used by finalize steps to reset history);
/// incremental appends go through `JobStore::append_log` instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<JobLogEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_links: Option<Vec<CandidateLink>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn logs(mut self, logs: Vec<JobLogEntry>) -> Self {
        self.logs = Some(logs);
        self
    }

    pub fn result(mut self, result: serde_json::Value) -> Self {
        self.result = Some(result);
        self
    }

    pub fn candidate_links(mut self, links: Vec<CandidateLink>) -> Self {
        self.candidate_links = Some(links);
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
