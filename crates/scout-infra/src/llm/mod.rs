//! LLM provider clients.

pub mod groq;

pub use groq::{GroqConnector, GroqProvider};
