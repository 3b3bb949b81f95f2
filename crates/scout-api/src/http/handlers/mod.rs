//! HTTP request handlers.

pub mod job;
pub mod plan;
pub mod research;

use serde::Deserialize;

/// Request-scoped API keys for the external collaborators.
///
/// Keys travel with the request and are never persisted on the job record.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeys {
    /// LLM provider key.
    #[serde(default)]
    pub llm: String,
    /// Web search provider key (not needed for plan generation).
    #[serde(default)]
    pub search: String,
    /// Embeddings provider key (vector_embed plan steps only).
    #[serde(default)]
    pub embedding: Option<String>,
    /// Vector store key (vector_embed plan steps only).
    #[serde(default)]
    pub vector: Option<String>,
    /// Vector store data-plane host override.
    #[serde(default)]
    pub vector_host: Option<String>,
}
