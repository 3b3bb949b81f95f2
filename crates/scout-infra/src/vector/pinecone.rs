//! PineconeSink -- concrete [`VectorSink`] over the Pinecone data-plane
//! upsert endpoint.
//!
//! Pinecone index hosts are per-account, so the data-plane host is supplied
//! by configuration rather than derived here. The target index name is sent
//! as the upsert namespace.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;

use scout_core::embed::VectorSink;
use scout_types::embed::EmbedError;

/// Pinecone vector upsert client.
pub struct PineconeSink {
    client: reqwest::Client,
    api_key: SecretString,
    host: String,
}

impl PineconeSink {
    /// `host` is the index data-plane host, e.g.
    /// `https://research-data-abc123.svc.us-east-1.pinecone.io`.
    pub fn new(api_key: SecretString, host: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to create reqwest client");
        Self {
            client,
            api_key,
            host,
        }
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a Value,
}

impl VectorSink for PineconeSink {
    async fn upsert(
        &self,
        index: &str,
        id: &str,
        vector: &[f32],
        metadata: &Value,
    ) -> Result<(), EmbedError> {
        let body = UpsertRequest {
            vectors: vec![UpsertVector {
                id,
                values: vector,
                metadata,
            }],
            namespace: index,
        };

        let url = format!("{}/vectors/upsert", self.host);
        let response = self
            .client
            .post(&url)
            .header("Api-Key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbedError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => EmbedError::AuthenticationFailed,
                _ => EmbedError::Provider {
                    message: format!("HTTP {status}: {error_body}"),
                },
            });
        }

        Ok(())
    }
}
