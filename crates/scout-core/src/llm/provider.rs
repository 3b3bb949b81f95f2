//! LlmProvider trait definition.
//!
//! `LlmProvider` is a single model-bound completion backend. `LlmConnector`
//! is the factory that binds a provider to a model id; the rate-limit-aware
//! invoker uses it to rebuild an agent on the fallback model after a
//! rate-limit error.
//!
//! Implementations live in scout-infra (e.g., `GroqConnector`).

use scout_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use super::box_provider::BoxLlmProvider;

/// Trait for a model-bound LLM completion backend.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "groq").
    fn name(&self) -> &str;

    /// The model this provider instance is bound to.
    fn model(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}

/// Factory binding a provider to a model id.
///
/// Object-safe (returns the concrete `BoxLlmProvider`), so pipelines can
/// hold it as `Arc<dyn LlmConnector>`.
pub trait LlmConnector: Send + Sync {
    fn provider_for(&self, model: &str) -> BoxLlmProvider;
}
