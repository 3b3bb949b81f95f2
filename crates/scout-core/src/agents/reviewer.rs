//! Reviewer agent.
//!
//! Extracts a structured JSON fragment from serialized search results for
//! one criterion. Fields the model cannot find must be reported as the
//! literal string "MISSING" rather than omitted. Output that does not parse
//! as a JSON object is an unrecoverable step error.

use serde_json::Value;

use scout_types::llm::{ChatMessage, CompletionRequest, LlmError};

use crate::llm::{BoxLlmProvider, ModelAgent};
use crate::text::strip_code_fences;

const TEMPLATE: &str = "You are a strict data reviewer.\n\
Your task is to extract relevant information from the search results based on \
the initial criteria and format it as a valid JSON object.\n\n\
Search Results: {searchResults}\n\
Criteria: {criteria}\n\n\
Ensure the JSON matches the requirements implied by the criteria.\n\
If data is missing, mark the field as \"MISSING\".\n\n\
Return ONLY the JSON object.";

/// Input to the reviewer.
#[derive(Debug, Clone)]
pub struct ReviewInput {
    /// Serialized (and already truncated) search results.
    pub search_results: String,
    /// Full criterion string guiding the extraction.
    pub criterion: String,
}

/// Agent extracting a JSON fragment per criterion.
pub struct Reviewer {
    provider: BoxLlmProvider,
}

impl Reviewer {
    pub fn new(provider: BoxLlmProvider) -> Self {
        Self { provider }
    }
}

impl ModelAgent for Reviewer {
    type Input = ReviewInput;
    type Output = Value;

    async fn invoke(&self, input: ReviewInput) -> Result<Value, LlmError> {
        let prompt = TEMPLATE
            .replace("{searchResults}", &input.search_results)
            .replace("{criteria}", &input.criterion);

        let request = CompletionRequest {
            model: self.provider.model().to_string(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: Some(0.0),
            max_tokens: Some(2048),
        };

        let response = self.provider.complete(&request).await?;
        let cleaned = strip_code_fences(&response.content);

        let value: Value = serde_json::from_str(&cleaned).map_err(|e| {
            LlmError::Deserialization(format!("reviewer output is not valid JSON: {e}"))
        })?;

        if !value.is_object() {
            return Err(LlmError::Deserialization(
                "reviewer output is not a JSON object".to_string(),
            ));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_types::llm::{CompletionResponse, Usage};

    use crate::llm::LlmProvider;

    struct FixedProvider {
        reply: String,
    }

    impl LlmProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn model(&self) -> &str {
            "fixed-model"
        }

        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                content: self.reply.clone(),
                model: "fixed-model".into(),
                usage: Usage::default(),
            })
        }
    }

    fn reviewer(reply: &str) -> Reviewer {
        Reviewer::new(BoxLlmProvider::new(FixedProvider {
            reply: reply.to_string(),
        }))
    }

    fn input() -> ReviewInput {
        ReviewInput {
            search_results: "[]".into(),
            criterion: "Population: city population".into(),
        }
    }

    #[tokio::test]
    async fn test_parses_json_object() {
        let value = reviewer(r#"{"population": "872000"}"#)
            .invoke(input())
            .await
            .unwrap();
        assert_eq!(value["population"], "872000");
    }

    #[tokio::test]
    async fn test_strips_markdown_fences() {
        let value = reviewer("```json\n{\"population\": \"MISSING\"}\n```")
            .invoke(input())
            .await
            .unwrap();
        assert_eq!(value["population"], "MISSING");
    }

    #[tokio::test]
    async fn test_malformed_output_is_unrecoverable() {
        let err = reviewer("the population is big").invoke(input()).await.unwrap_err();
        assert!(matches!(err, LlmError::Deserialization(_)));
    }

    #[tokio::test]
    async fn test_non_object_json_rejected() {
        let err = reviewer(r#"["a", "b"]"#).invoke(input()).await.unwrap_err();
        assert!(matches!(err, LlmError::Deserialization(_)));
    }
}
