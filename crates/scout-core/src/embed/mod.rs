//! Embedding and vector-store collaborator traits.
//!
//! Both are external HTTP services from the orchestrator's perspective; the
//! vector_embed plan step treats the upsert as fire-and-forget (its result
//! is never threaded further). Concrete clients live in scout-infra.

use std::future::Future;
use std::pin::Pin;

use scout_types::embed::EmbedError;

// ---------------------------------------------------------------------------
// Embedder
// ---------------------------------------------------------------------------

/// Trait for converting text into embedding vectors.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait Embedder: Send + Sync {
    /// Embed one or more texts into vectors, one vector per input.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, EmbedError>> + Send;

    /// The model name used for embeddings.
    fn model_name(&self) -> &str;

    /// Dimensionality of the output vectors.
    fn dimension(&self) -> usize;
}

/// Object-safe version of [`Embedder`] with boxed futures.
pub trait EmbedderDyn: Send + Sync {
    fn embed_boxed<'a>(
        &'a self,
        texts: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, EmbedError>> + Send + 'a>>;

    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize;
}

impl<T: Embedder> EmbedderDyn for T {
    fn embed_boxed<'a>(
        &'a self,
        texts: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, EmbedError>> + Send + 'a>> {
        Box::pin(self.embed(texts))
    }

    fn model_name(&self) -> &str {
        Embedder::model_name(self)
    }

    fn dimension(&self) -> usize {
        Embedder::dimension(self)
    }
}

/// Type-erased embedder.
pub struct BoxEmbedder {
    inner: Box<dyn EmbedderDyn + Send + Sync>,
}

impl BoxEmbedder {
    pub fn new<T: Embedder + 'static>(embedder: T) -> Self {
        Self {
            inner: Box::new(embedder),
        }
    }

    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        self.inner.embed_boxed(texts).await
    }

    pub fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    pub fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

// ---------------------------------------------------------------------------
// Vector sink
// ---------------------------------------------------------------------------

/// Trait for upserting vectors into the external vector store.
pub trait VectorSink: Send + Sync {
    /// Upsert one vector with its metadata into the named index.
    fn upsert(
        &self,
        index: &str,
        id: &str,
        vector: &[f32],
        metadata: &serde_json::Value,
    ) -> impl std::future::Future<Output = Result<(), EmbedError>> + Send;
}

/// Object-safe version of [`VectorSink`] with boxed futures.
pub trait VectorSinkDyn: Send + Sync {
    fn upsert_boxed<'a>(
        &'a self,
        index: &'a str,
        id: &'a str,
        vector: &'a [f32],
        metadata: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), EmbedError>> + Send + 'a>>;
}

impl<T: VectorSink> VectorSinkDyn for T {
    fn upsert_boxed<'a>(
        &'a self,
        index: &'a str,
        id: &'a str,
        vector: &'a [f32],
        metadata: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), EmbedError>> + Send + 'a>> {
        Box::pin(self.upsert(index, id, vector, metadata))
    }
}

/// Type-erased vector sink.
pub struct BoxVectorSink {
    inner: Box<dyn VectorSinkDyn + Send + Sync>,
}

impl BoxVectorSink {
    pub fn new<T: VectorSink + 'static>(sink: T) -> Self {
        Self {
            inner: Box::new(sink),
        }
    }

    pub async fn upsert(
        &self,
        index: &str,
        id: &str,
        vector: &[f32],
        metadata: &serde_json::Value,
    ) -> Result<(), EmbedError> {
        self.inner.upsert_boxed(index, id, vector, metadata).await
    }
}
