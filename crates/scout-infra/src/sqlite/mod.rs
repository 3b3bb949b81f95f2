//! SQLite persistence via sqlx.

pub mod job;
pub mod pool;
pub mod workflow;

pub use job::SqliteJobStore;
pub use pool::DatabasePool;
pub use workflow::SqliteWorkflowState;
