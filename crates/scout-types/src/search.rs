//! Web search collaborator types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::CandidateLink;

/// One hit returned by the search provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    /// Extracted page content or snippet.
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl From<&SearchResult> for CandidateLink {
    fn from(hit: &SearchResult) -> Self {
        CandidateLink {
            url: hit.url.clone(),
            title: hit.title.clone(),
            snippet: hit.content.chars().take(280).collect(),
        }
    }
}

/// Errors from the search provider.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search provider error: {message}")]
    Provider { message: String },

    #[error("search deserialization error: {0}")]
    Deserialization(String),

    #[error("search authentication failed")]
    AuthenticationFailed,
}
