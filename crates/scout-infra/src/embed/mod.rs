//! Embedding provider clients.

pub mod mixedbread;

pub use mixedbread::MixedbreadEmbedder;
