//! LLM provider abstraction and the rate-limit-aware invoker.

pub mod box_provider;
pub mod invoker;
pub mod provider;

pub use box_provider::BoxLlmProvider;
pub use invoker::{invoke_with_fallback, ModelAgent};
pub use provider::{LlmConnector, LlmProvider};
