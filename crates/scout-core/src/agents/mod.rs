//! Research agents: thin prompt wrappers over a model-bound LLM provider.

pub mod enhancer;
pub mod planner;
pub mod reviewer;

pub use enhancer::{EnhancerInput, PromptEnhancer};
pub use planner::Planner;
pub use reviewer::{ReviewInput, Reviewer};
