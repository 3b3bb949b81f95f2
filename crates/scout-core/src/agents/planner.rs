//! Planner agent.
//!
//! Breaks a high-level research objective into an ordered plan of executable
//! steps. Normalization of the model's output into typed `PlanStep`s happens
//! here, at plan-generation time -- in particular the decision whether a
//! vector_embed step embeds a literal text or the previous step's output is
//! fixed in the plan itself, so the executor never has to guess.

use serde::Deserialize;
use serde_json::Value;

use scout_types::llm::{ChatMessage, CompletionRequest, LlmError};
use scout_types::plan::{EmbedParams, EmbedSource, PlanAction, PlanStep, ResearchParams};

use crate::llm::BoxLlmProvider;
use crate::text::strip_code_fences;

const SYSTEM_PROMPT: &str = "You are an expert Research Architect AI.\n\
Your goal is to break down a user's high-level research objective into a \
sequence of executable pipeline steps.\n\n\
AVAILABLE PIPELINES (Tools):\n\
1. RESEARCH (type: 'research')\n\
   - Use for: finding information, answering questions, topic research.\n\
   - Params:\n\
     - keywords: string (main research query)\n\
     - criteria: string[] (specific aspects to analyze, e.g. [\"Market Size\", \"Competitors\"])\n\
2. VECTOR_EMBED (type: 'vector_embed')\n\
   - Use for: storing text for long-term memory/RAG. ONLY use if the user \
explicitly mentions storing, remembering, or saving to a database/memory.\n\
   - Params:\n\
     - text: string (what to embed -- usually \"output from previous step\")\n\
     - index: string (default: \"research-data\")\n\n\
OUTPUT FORMAT:\n\
Return ONLY a raw JSON array of objects. Do not include markdown formatting.\n\
Each object: {\"id\", \"type\", \"label\", \"description\", \"params\"}.\n\n\
RULES:\n\
- Keep steps atomic.\n\
- If the request is complex, break it into multiple RESEARCH steps.\n\
- Only use VECTOR_EMBED if asked.";

/// Agent generating an executable plan from a user objective.
pub struct Planner {
    provider: BoxLlmProvider,
}

/// Raw step shape as emitted by the model, before normalization.
#[derive(Debug, Deserialize)]
struct RawPlanStep {
    id: String,
    #[serde(rename = "type")]
    step_type: String,
    label: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    params: Value,
}

impl Planner {
    pub fn new(provider: BoxLlmProvider) -> Self {
        Self { provider }
    }

    /// Generate an ordered plan for the given objective.
    pub async fn generate_plan(&self, objective: &str) -> Result<Vec<PlanStep>, LlmError> {
        let request = CompletionRequest {
            model: self.provider.model().to_string(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(objective),
            ],
            temperature: Some(0.2),
            max_tokens: Some(2048),
        };

        let response = self.provider.complete(&request).await?;
        let cleaned = strip_code_fences(&response.content);

        let raw: Vec<RawPlanStep> = serde_json::from_str(&cleaned).map_err(|e| {
            LlmError::Deserialization(format!("planner output is not a valid plan: {e}"))
        })?;

        raw.into_iter().map(normalize_step).collect()
    }
}

/// Turn one raw model step into a typed `PlanStep`.
fn normalize_step(raw: RawPlanStep) -> Result<PlanStep, LlmError> {
    let action = match raw.step_type.as_str() {
        "research" => {
            let params: ResearchParams = serde_json::from_value(raw.params).map_err(|e| {
                LlmError::Deserialization(format!(
                    "research step '{}' has invalid params: {e}",
                    raw.id
                ))
            })?;
            PlanAction::Research(params)
        }
        "vector_embed" => PlanAction::VectorEmbed(normalize_embed_params(raw.params)?),
        other => {
            return Err(LlmError::Deserialization(format!(
                "planner produced unknown step type '{other}'"
            )));
        }
    };

    Ok(PlanStep {
        id: raw.id,
        label: raw.label,
        description: raw.description,
        action,
    })
}

/// Map raw embed params onto the tagged `EmbedSource`.
///
/// The model is prompted to describe what to embed as free text; a text that
/// is empty or references the prior step's output ("output" / "previous")
/// becomes `PreviousStepOutput`. This interpretation happens once, here --
/// the executor only ever sees the tagged source.
fn normalize_embed_params(params: Value) -> Result<EmbedParams, LlmError> {
    // Already-tagged params pass through unchanged.
    if params.get("source").is_some() {
        return serde_json::from_value(params).map_err(|e| {
            LlmError::Deserialization(format!("vector_embed step has invalid params: {e}"))
        });
    }

    let index = params
        .get("index")
        .or_else(|| params.get("pineconeIndex"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let source = match params.get("text").and_then(Value::as_str) {
        None => EmbedSource::PreviousStepOutput,
        Some(text) => {
            let lower = text.to_lowercase();
            if text.trim().is_empty() || lower.contains("output") || lower.contains("previous") {
                EmbedSource::PreviousStepOutput
            } else {
                EmbedSource::Literal {
                    text: text.to_string(),
                }
            }
        }
    };

    Ok(EmbedParams { source, index })
}
