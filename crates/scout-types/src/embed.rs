//! Embedding and vector-store collaborator types.

use thiserror::Error;

/// Errors from embedding or vector-store calls.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding provider error: {message}")]
    Provider { message: String },

    #[error("embedding deserialization error: {0}")]
    Deserialization(String),

    #[error("embedding authentication failed")]
    AuthenticationFailed,
}
