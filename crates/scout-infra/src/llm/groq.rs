//! GroqProvider -- concrete [`LlmProvider`] over the Groq OpenAI-compatible
//! chat completions API.
//!
//! `GroqConnector` is the [`LlmConnector`] factory: it binds one provider
//! instance per model id, which is how the rate-limit-aware invoker swaps
//! to the fallback model.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use scout_core::llm::{BoxLlmProvider, LlmConnector, LlmProvider};
use scout_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai";

/// Factory producing model-bound [`GroqProvider`] instances.
pub struct GroqConnector {
    api_key: SecretString,
    base_url: String,
    client: reqwest::Client,
}

impl GroqConnector {
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to create reqwest client");
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

impl LlmConnector for GroqConnector {
    fn provider_for(&self, model: &str) -> BoxLlmProvider {
        BoxLlmProvider::new(GroqProvider {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: model.to_string(),
        })
    }
}

/// One model-bound Groq chat completions client.
pub struct GroqProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: String,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Deserialize)]
struct WireResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Map an HTTP error status and body onto a typed [`LlmError`].
fn map_error_status(status: u16, retry_after_ms: Option<u64>, body: String) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited { retry_after_ms },
        400 => LlmError::InvalidRequest(body),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<f64>()
        .ok()
        .map(|secs| (secs * 1000.0) as u64)
}

impl LlmProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.to_string(),
                    content: &m.content,
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let error_body = response.text().await.unwrap_or_default();
            return Err(map_error_status(status.as_u16(), retry_after, error_body));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Deserialization("response has no choices".to_string()))?;

        let usage = parsed
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content,
            model: parsed.model,
            usage,
        })
    }
}

// GroqProvider intentionally does NOT derive Debug so the SecretString
// field can never leak through formatting.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_error_status(401, None, String::new()),
            LlmError::AuthenticationFailed
        ));
        assert!(matches!(
            map_error_status(429, Some(1500), String::new()),
            LlmError::RateLimited {
                retry_after_ms: Some(1500)
            }
        ));
        assert!(matches!(
            map_error_status(400, None, "bad".into()),
            LlmError::InvalidRequest(_)
        ));
        match map_error_status(503, None, "overloaded".into()) {
            LlmError::Provider { message } => assert!(message.contains("503")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_retry_after_header_parsed_to_millis() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, "2".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(2000));

        headers.insert(reqwest::header::RETRY_AFTER, "0.5".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(500));

        headers.remove(reqwest::header::RETRY_AFTER);
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_connector_binds_model() {
        let connector = GroqConnector::new(SecretString::from("gsk_test"));
        let provider = connector.provider_for("llama-3.3-70b-versatile");
        assert_eq!(provider.model(), "llama-3.3-70b-versatile");
        assert_eq!(provider.name(), "groq");
    }

    #[test]
    fn test_request_serialization_shape() {
        let body = ChatCompletionRequest {
            model: "m",
            messages: vec![WireMessage {
                role: "user".into(),
                content: "hello",
            }],
            temperature: Some(0.7),
            max_tokens: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"model\":\"m\""));
        assert!(json.contains("\"temperature\":0.7"));
        assert!(!json.contains("max_tokens"));
    }
}
