//! Rate-limit-aware invoker.
//!
//! Wraps a single agent call with primary/fallback model selection. The
//! policy is exactly one fallback attempt: no exponential backoff, no
//! cascading chains. Transient errors other than rate limits are not
//! retried here -- that is a deliberate design choice, not an oversight.

use scout_types::llm::LlmError;

use crate::job::JobStore;

/// A model-bound agent callable with a typed input.
///
/// Agents are cheap to construct: the invoker rebuilds one on the fallback
/// model after a rate-limit error instead of mutating the original.
pub trait ModelAgent: Send + Sync {
    type Input: Send + Sync + Clone;
    type Output: Send;

    fn invoke(
        &self,
        input: Self::Input,
    ) -> impl std::future::Future<Output = Result<Self::Output, LlmError>> + Send;
}

/// Call an agent bound to `primary_model`; on a recognized rate-limit error,
/// log to the job and retry exactly once on `fallback_model`.
///
/// - Non-rate-limit errors are re-raised immediately without a fallback
///   attempt.
/// - A fallback failure is logged and the fallback's error re-raised.
/// - Log-write failures never abort the call; they are traced and dropped.
pub async fn invoke_with_fallback<S, A, F>(
    store: &S,
    job_id: &str,
    factory: F,
    input: A::Input,
    primary_model: &str,
    fallback_model: Option<&str>,
) -> Result<A::Output, LlmError>
where
    S: JobStore,
    A: ModelAgent,
    F: Fn(&str) -> A + Send + Sync,
{
    let agent = factory(primary_model);
    match agent.invoke(input.clone()).await {
        Ok(output) => Ok(output),
        Err(err) if err.is_rate_limit() && fallback_model.is_some() => {
            let fallback = fallback_model.unwrap_or_default();
            note(
                store,
                job_id,
                &format!("Rate limit hit on {primary_model}. Switching to fallback: {fallback}"),
            )
            .await;

            let fallback_agent = factory(fallback);
            match fallback_agent.invoke(input).await {
                Ok(output) => Ok(output),
                Err(fallback_err) => {
                    note(store, job_id, "Fallback model also failed.").await;
                    Err(fallback_err)
                }
            }
        }
        Err(err) => Err(err),
    }
}

async fn note<S: JobStore>(store: &S, job_id: &str, message: &str) {
    if let Err(e) = store
        .append_log(job_id, scout_types::job::LogKind::Error, message)
        .await
    {
        tracing::warn!(job_id, error = %e, "failed to record invoker log entry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use scout_types::job::LogKind;

    use crate::job::MemoryJobStore;

    /// Scripted agent: fails with the given error when bound to a model in
    /// `failing_models`, succeeds otherwise, counting every call.
    struct StubAgent {
        model: String,
        failing: Vec<(String, StubError)>,
        calls: Arc<AtomicU32>,
    }

    #[derive(Clone)]
    enum StubError {
        RateLimited,
        RateLimitMessage,
        Auth,
        Provider,
    }

    impl StubError {
        fn to_llm(&self) -> LlmError {
            match self {
                StubError::RateLimited => LlmError::RateLimited {
                    retry_after_ms: Some(500),
                },
                StubError::RateLimitMessage => LlmError::Provider {
                    message: "HTTP 429: rate limit exceeded".into(),
                },
                StubError::Auth => LlmError::AuthenticationFailed,
                StubError::Provider => LlmError::Provider {
                    message: "HTTP 500".into(),
                },
            }
        }
    }

    impl ModelAgent for StubAgent {
        type Input = String;
        type Output = String;

        async fn invoke(&self, input: String) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            for (model, err) in &self.failing {
                if *model == self.model {
                    return Err(err.to_llm());
                }
            }
            Ok(format!("{}:{input}", self.model))
        }
    }

    fn factory(
        failing: Vec<(String, StubError)>,
        calls: Arc<AtomicU32>,
    ) -> impl Fn(&str) -> StubAgent {
        move |model: &str| StubAgent {
            model: model.to_string(),
            failing: failing.clone(),
            calls: Arc::clone(&calls),
        }
    }

    async fn store_with_job() -> MemoryJobStore {
        let store = MemoryJobStore::new();
        store.create("j1", None, None).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_primary_success_no_fallback_call() {
        let store = store_with_job().await;
        let calls = Arc::new(AtomicU32::new(0));
        let out = invoke_with_fallback(
            &store,
            "j1",
            factory(vec![], Arc::clone(&calls)),
            "input".to_string(),
            "primary",
            Some("fallback"),
        )
        .await
        .unwrap();
        assert_eq!(out, "primary:input");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_switches_once_and_logs_once() {
        let store = store_with_job().await;
        let calls = Arc::new(AtomicU32::new(0));
        let out = invoke_with_fallback(
            &store,
            "j1",
            factory(
                vec![("primary".into(), StubError::RateLimited)],
                Arc::clone(&calls),
            ),
            "input".to_string(),
            "primary",
            Some("fallback"),
        )
        .await
        .unwrap();

        assert_eq!(out, "fallback:input");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Exactly one switch log line, no duplicates
        let record = store.get("j1").await.unwrap().unwrap();
        let switch_logs: Vec<_> = record
            .logs
            .iter()
            .filter(|l| l.kind == LogKind::Error && l.message.contains("Switching to fallback"))
            .collect();
        assert_eq!(switch_logs.len(), 1);
        assert!(switch_logs[0].message.contains("primary"));
        assert!(switch_logs[0].message.contains("fallback"));
    }

    #[tokio::test]
    async fn test_rate_limit_recognized_from_message_pattern() {
        let store = store_with_job().await;
        let calls = Arc::new(AtomicU32::new(0));
        let out = invoke_with_fallback(
            &store,
            "j1",
            factory(
                vec![("primary".into(), StubError::RateLimitMessage)],
                Arc::clone(&calls),
            ),
            "q".to_string(),
            "primary",
            Some("fallback"),
        )
        .await
        .unwrap();
        assert_eq!(out, "fallback:q");
    }

    #[tokio::test]
    async fn test_no_fallback_model_reraises() {
        let store = store_with_job().await;
        let calls = Arc::new(AtomicU32::new(0));
        let err = invoke_with_fallback(
            &store,
            "j1",
            factory(
                vec![("primary".into(), StubError::RateLimited)],
                Arc::clone(&calls),
            ),
            "q".to_string(),
            "primary",
            None,
        )
        .await
        .unwrap_err();
        assert!(err.is_rate_limit());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_rate_limit_error_fails_immediately() {
        let store = store_with_job().await;
        let calls = Arc::new(AtomicU32::new(0));
        let err = invoke_with_fallback(
            &store,
            "j1",
            factory(vec![("primary".into(), StubError::Auth)], Arc::clone(&calls)),
            "q".to_string(),
            "primary",
            Some("fallback"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LlmError::AuthenticationFailed));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let record = store.get("j1").await.unwrap().unwrap();
        assert!(record.logs.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_failure_logged_and_reraised() {
        let store = store_with_job().await;
        let calls = Arc::new(AtomicU32::new(0));
        let err = invoke_with_fallback(
            &store,
            "j1",
            factory(
                vec![
                    ("primary".into(), StubError::RateLimited),
                    ("fallback".into(), StubError::Provider),
                ],
                Arc::clone(&calls),
            ),
            "q".to_string(),
            "primary",
            Some("fallback"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LlmError::Provider { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let record = store.get("j1").await.unwrap().unwrap();
        let messages: Vec<_> = record.logs.iter().map(|l| l.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("Switching to fallback")));
        assert!(messages.iter().any(|m| m.contains("Fallback model also failed")));
    }
}
