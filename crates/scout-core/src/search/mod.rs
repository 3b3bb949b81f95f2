//! Web search collaborator trait.
//!
//! The pipelines only need the call/response contract; the concrete client
//! (Tavily) lives in scout-infra.

use std::future::Future;
use std::pin::Pin;

use scout_types::search::{SearchError, SearchResult};

/// Trait for the external web search provider.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait SearchProvider: Send + Sync {
    /// Run one search query and return the ranked hits.
    fn search(
        &self,
        query: &str,
    ) -> impl std::future::Future<Output = Result<Vec<SearchResult>, SearchError>> + Send;
}

/// Object-safe version of [`SearchProvider`] with boxed futures.
pub trait SearchProviderDyn: Send + Sync {
    fn search_boxed<'a>(
        &'a self,
        query: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SearchResult>, SearchError>> + Send + 'a>>;
}

impl<T: SearchProvider> SearchProviderDyn for T {
    fn search_boxed<'a>(
        &'a self,
        query: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SearchResult>, SearchError>> + Send + 'a>> {
        Box::pin(self.search(query))
    }
}

/// Type-erased search provider.
pub struct BoxSearchProvider {
    inner: Box<dyn SearchProviderDyn + Send + Sync>,
}

impl BoxSearchProvider {
    pub fn new<T: SearchProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        self.inner.search_boxed(query).await
    }
}
