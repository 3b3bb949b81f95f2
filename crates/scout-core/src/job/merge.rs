//! Shared update-merge semantics for every `JobStore` backing.
//!
//! Keeping the rules in one function (instead of per-backend copies) is what
//! makes the store invariants hold uniformly: terminal statuses are final,
//! progress never decreases, and candidate links only exist while the job is
//! waiting for a selection.

use chrono::Utc;
use scout_types::job::{JobRecord, JobStatus, JobUpdate};

/// What `apply_update` did with the update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The update was merged into the record.
    Applied,
    /// The record is terminal; the update was dropped.
    IgnoredTerminal,
}

/// Merge a partial update into a record in place.
///
/// Rules:
/// - A terminal record (`completed` / `failed` / `cancelled`) accepts no
///   further updates; the caller should log the dropped update.
/// - `progress` is clamped to be non-decreasing.
/// - `candidate_links` are cleared whenever the effective status is not
///   `waiting_for_selection`.
pub fn apply_update(record: &mut JobRecord, update: JobUpdate) -> UpdateOutcome {
    if record.status.is_terminal() {
        return UpdateOutcome::IgnoredTerminal;
    }

    if let Some(status) = update.status {
        record.status = status;
    }
    if let Some(progress) = update.progress {
        record.progress = record.progress.max(progress.min(100));
    }
    if let Some(logs) = update.logs {
        record.logs = logs;
    }
    if let Some(result) = update.result {
        record.result = Some(result);
    }
    if let Some(links) = update.candidate_links {
        record.candidate_links = links;
    }
    if let Some(error) = update.error {
        record.error = Some(error);
    }

    if record.status != JobStatus::WaitingForSelection {
        record.candidate_links.clear();
    }

    record.updated_at = Utc::now();
    UpdateOutcome::Applied
}
