//! SQLite workflow state implementation.
//!
//! Persists memoized step outputs and the correlated signal queue. This is
//! the durable half of the step executor: a process restart replays
//! completed steps from `workflow_steps` and re-enters waits against
//! `workflow_signals`.

use chrono::Utc;
use serde_json::Value;
use sqlx::Row;

use scout_core::workflow::WorkflowStateRepository;
use scout_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `WorkflowStateRepository`.
pub struct SqliteWorkflowState {
    pool: DatabasePool,
}

impl SqliteWorkflowState {
    /// Create a new workflow state store backed by the given pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl WorkflowStateRepository for SqliteWorkflowState {
    async fn get_step(&self, job_id: &str, step: &str) -> Result<Option<Value>, RepositoryError> {
        let row = sqlx::query("SELECT output FROM workflow_steps WHERE job_id = ? AND step = ?")
            .bind(job_id)
            .bind(step)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let raw: String = row
                    .try_get("output")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                let value = serde_json::from_str(&raw)
                    .map_err(|e| RepositoryError::Query(format!("invalid step output: {e}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn put_step(
        &self,
        job_id: &str,
        step: &str,
        output: &Value,
    ) -> Result<(), RepositoryError> {
        let raw = serde_json::to_string(output)
            .map_err(|e| RepositoryError::Query(format!("failed to serialize output: {e}")))?;

        sqlx::query(
            r#"INSERT INTO workflow_steps (job_id, step, output, completed_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (job_id, step) DO UPDATE SET output = excluded.output"#,
        )
        .bind(job_id)
        .bind(step)
        .bind(raw)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn completed_steps(&self, job_id: &str) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT step FROM workflow_steps WHERE job_id = ? ORDER BY completed_at, step",
        )
        .bind(job_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                row.try_get("step")
                    .map_err(|e| RepositoryError::Query(e.to_string()))
            })
            .collect()
    }

    async fn push_signal(&self, job_id: &str, payload: &Value) -> Result<(), RepositoryError> {
        let raw = serde_json::to_string(payload)
            .map_err(|e| RepositoryError::Query(format!("failed to serialize signal: {e}")))?;

        sqlx::query("INSERT INTO workflow_signals (job_id, payload, created_at) VALUES (?, ?, ?)")
            .bind(job_id)
            .bind(raw)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn take_signal(&self, job_id: &str) -> Result<Option<Value>, RepositoryError> {
        // DELETE ... RETURNING pops the oldest signal atomically on the
        // single-connection writer pool.
        let row = sqlx::query(
            r#"DELETE FROM workflow_signals
               WHERE id = (SELECT id FROM workflow_signals WHERE job_id = ? ORDER BY id LIMIT 1)
               RETURNING payload"#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let raw: String = row
                    .try_get("payload")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                let value = serde_json::from_str(&raw)
                    .map_err(|e| RepositoryError::Query(format!("invalid signal payload: {e}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn test_state() -> SqliteWorkflowState {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        SqliteWorkflowState::new(DatabasePool::new(&url).await.unwrap())
    }

    #[tokio::test]
    async fn test_step_memo_roundtrip() {
        let state = test_state().await;
        assert!(state.get_step("j", "init").await.unwrap().is_none());

        state
            .put_step("j", "init", &json!({"progress": 5}))
            .await
            .unwrap();
        assert_eq!(
            state.get_step("j", "init").await.unwrap(),
            Some(json!({"progress": 5}))
        );
    }

    #[tokio::test]
    async fn test_step_memo_scoped_by_job() {
        let state = test_state().await;
        state.put_step("a", "s", &json!(1)).await.unwrap();
        assert!(state.get_step("b", "s").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_completed_steps_listed() {
        let state = test_state().await;
        state.put_step("j", "init-job", &Value::Null).await.unwrap();
        state
            .put_step("j", "process-criterion-0", &json!({"population": "872000"}))
            .await
            .unwrap();

        let steps = state.completed_steps("j").await.unwrap();
        assert_eq!(steps.len(), 2);
        assert!(steps.contains(&"init-job".to_string()));
    }

    #[tokio::test]
    async fn test_signal_queue_fifo_and_consumed_once() {
        let state = test_state().await;
        state.push_signal("j", &json!({"selected": ["a"]})).await.unwrap();
        state.push_signal("j", &json!({"selected": ["b"]})).await.unwrap();

        assert_eq!(
            state.take_signal("j").await.unwrap(),
            Some(json!({"selected": ["a"]}))
        );
        assert_eq!(
            state.take_signal("j").await.unwrap(),
            Some(json!({"selected": ["b"]}))
        );
        assert_eq!(state.take_signal("j").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_signals_scoped_by_job() {
        let state = test_state().await;
        state.push_signal("alpha", &json!("x")).await.unwrap();
        assert_eq!(state.take_signal("beta").await.unwrap(), None);
        assert_eq!(state.take_signal("alpha").await.unwrap(), Some(json!("x")));
    }
}
