//! The durable step executor.
//!
//! A workflow is a deterministic ordered sequence of named steps executed
//! top-to-bottom against one job. Each step's result is memoized against
//! `(job_id, step name)` in durable state, which is what makes a workflow
//! survive process restarts: on re-entry, completed steps return their
//! stored results instead of re-executing side effects.

pub mod ctx;
pub mod engine;
pub mod signal;
pub mod state;

pub use ctx::StepCtx;
pub use engine::{EngineError, WorkflowEngine};
pub use signal::SignalHub;
pub use state::{MemoryWorkflowState, WorkflowStateRepository};
