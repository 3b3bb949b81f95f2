//! Business logic for Scout: the durable step executor, the job store
//! contract, LLM/search/embedding collaborator traits, the research agents,
//! and the three concrete pipelines built on top of them.
//!
//! Storage and provider implementations live in scout-infra; this crate
//! only defines the traits they implement (native async fn in traits,
//! Rust 2024 edition, no async_trait macro).

pub mod agents;
pub mod embed;
pub mod job;
pub mod llm;
pub mod pipeline;
pub mod search;
pub mod text;
pub mod workflow;
