//! Job store trait.
//!
//! The job record store is the only state shared across workflow instances.
//! Every mutation must be atomic per key; no cross-job transactions are
//! required. Implementations live in scout-infra (SQLite primary, JSON-file
//! secondary, and a best-effort replicated wrapper over both).

use scout_types::error::RepositoryError;
use scout_types::job::{JobRecord, JobUpdate, LogKind};

/// Trait for durable job record persistence.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait JobStore: Send + Sync {
    /// Create a fresh record (`status = pending`, `progress = 0`).
    ///
    /// Fails with `RepositoryError::Conflict` if the id already exists.
    fn create(
        &self,
        id: &str,
        owner: Option<String>,
        plan: Option<serde_json::Value>,
    ) -> impl std::future::Future<Output = Result<JobRecord, RepositoryError>> + Send;

    /// Merge the provided fields into the record; unset fields are left
    /// unchanged. `logs` here replaces the history wholesale (finalize
    /// reset); incremental appends go through `append_log`.
    ///
    /// Updates against a terminal record are ignored (and logged), never
    /// applied: `completed`, `failed`, and `cancelled` are final.
    fn update(
        &self,
        id: &str,
        update: JobUpdate,
    ) -> impl std::future::Future<Output = Result<JobRecord, RepositoryError>> + Send;

    /// Append one log entry with a store-assigned timestamp.
    ///
    /// Silently a no-op when the job does not exist.
    fn append_log(
        &self,
        id: &str,
        kind: LogKind,
        message: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Fetch a record by id.
    fn get(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<JobRecord>, RepositoryError>> + Send;

    /// Jobs left in a non-terminal status (restart recovery).
    fn list_incomplete(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<JobRecord>, RepositoryError>> + Send;

    /// Most recently created jobs, newest first.
    fn list_recent(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<JobRecord>, RepositoryError>> + Send;
}
