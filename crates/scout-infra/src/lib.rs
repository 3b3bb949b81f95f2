//! Infrastructure implementations for Scout.
//!
//! Concrete backings for the traits defined in scout-core: SQLite
//! persistence (jobs + workflow state), a JSON-file job archive, the
//! best-effort replicated store, and the HTTP clients for the external
//! LLM / search / embedding / vector collaborators.

pub mod embed;
pub mod llm;
pub mod search;
pub mod sqlite;
pub mod store;
pub mod vector;
