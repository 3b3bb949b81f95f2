//! Prompt enhancer agent.
//!
//! Converts keywords plus one criterion into a single bounded search query
//! for the web search provider. The output is hard-capped at 300 characters
//! so a rambling completion can never blow up the downstream search call.

use scout_types::llm::{ChatMessage, CompletionRequest, LlmError};

use crate::llm::{BoxLlmProvider, ModelAgent};
use crate::text::truncate_chars;

/// Maximum length of a generated search query, in characters.
pub const MAX_QUERY_CHARS: usize = 300;

const TEMPLATE: &str = "You are a research expert. Convert the following keywords and criteria \
into a comprehensive search query for a web search engine.\n\n\
Keywords: {keywords}\n\
Criteria: {criteria}\n\n\
Return ONLY the search query, nothing else.";

/// Input to the prompt enhancer.
#[derive(Debug, Clone)]
pub struct EnhancerInput {
    pub keywords: Vec<String>,
    /// Full criterion string ("Name: description"), or a URL-scoped
    /// instruction built by the extended flow.
    pub criterion: String,
}

/// Agent producing one bounded search query per criterion.
pub struct PromptEnhancer {
    provider: BoxLlmProvider,
}

impl PromptEnhancer {
    pub fn new(provider: BoxLlmProvider) -> Self {
        Self { provider }
    }
}

impl ModelAgent for PromptEnhancer {
    type Input = EnhancerInput;
    type Output = String;

    async fn invoke(&self, input: EnhancerInput) -> Result<String, LlmError> {
        let prompt = TEMPLATE
            .replace("{keywords}", &input.keywords.join(", "))
            .replace("{criteria}", &input.criterion);

        let request = CompletionRequest {
            model: self.provider.model().to_string(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: Some(0.7),
            max_tokens: Some(256),
        };

        let response = self.provider.complete(&request).await?;
        let query = response.content.trim();
        if query.is_empty() {
            return Err(LlmError::Deserialization(
                "enhancer returned an empty query".to_string(),
            ));
        }
        Ok(truncate_chars(query, MAX_QUERY_CHARS))
    }
}
