//! Vector store clients.

pub mod pinecone;

pub use pinecone::PineconeSink;
