//! REST API layer: router, handlers, error and response envelopes.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
