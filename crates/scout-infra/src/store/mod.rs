//! Non-SQLite job store backings: the JSON-file archive and the
//! best-effort replicated wrapper.

pub mod json_file;
pub mod replicated;

pub use json_file::JsonFileJobStore;
pub use replicated::ReplicatedJobStore;
