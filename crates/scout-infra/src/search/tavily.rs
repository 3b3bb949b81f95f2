//! TavilyClient -- concrete [`SearchProvider`] over the Tavily search API.
//!
//! Searches with `search_depth: advanced` and a fixed result cap, matching
//! what the research pipelines expect. Tavily authenticates with the key in
//! the request body; the key is held as a [`secrecy::SecretString`] and only
//! exposed while building that body.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use scout_core::search::SearchProvider;
use scout_types::search::{SearchError, SearchResult};

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Number of hits requested per query.
pub const MAX_RESULTS: u32 = 10;

/// Tavily search API client.
pub struct TavilyClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl TavilyClient {
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to create reqwest client");
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct TavilySearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: u32,
}

#[derive(Deserialize)]
struct TavilySearchResponse {
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Deserialize)]
struct TavilyHit {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: Option<f32>,
}

impl From<TavilyHit> for SearchResult {
    fn from(hit: TavilyHit) -> Self {
        SearchResult {
            url: hit.url,
            title: hit.title,
            content: hit.content,
            score: hit.score,
        }
    }
}

impl SearchProvider for TavilyClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let body = TavilySearchRequest {
            api_key: self.api_key.expose_secret(),
            query,
            search_depth: "advanced",
            max_results: MAX_RESULTS,
        };

        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => SearchError::AuthenticationFailed,
                _ => SearchError::Provider {
                    message: format!("HTTP {status}: {error_body}"),
                },
            });
        }

        let parsed: TavilySearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Deserialization(format!("failed to parse response: {e}")))?;

        Ok(parsed.results.into_iter().map(SearchResult::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let body = TavilySearchRequest {
            api_key: "tvly-test",
            query: "Lisbon population",
            search_depth: "advanced",
            max_results: MAX_RESULTS,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"search_depth\":\"advanced\""));
        assert!(json.contains("\"max_results\":10"));
    }

    #[test]
    fn test_response_hit_mapping_with_missing_fields() {
        let raw = r#"{"results": [{"url": "https://a", "content": "text"}]}"#;
        let parsed: TavilySearchResponse = serde_json::from_str(raw).unwrap();
        let hits: Vec<SearchResult> = parsed.results.into_iter().map(SearchResult::from).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://a");
        assert_eq!(hits[0].title, "");
        assert!(hits[0].score.is_none());
    }

    #[test]
    fn test_empty_response_is_empty_hits() {
        let parsed: TavilySearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_empty());
    }
}
