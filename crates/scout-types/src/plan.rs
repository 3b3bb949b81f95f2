//! Agent plan types.
//!
//! A plan is an ordered, user-approved list of heterogeneous steps executed
//! by the plan executor pipeline. Steps are immutable input: the executor
//! never mutates them.

use serde::{Deserialize, Serialize};

/// One step of an agent plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Step identifier assigned by the planner (e.g. "step-1").
    pub id: String,
    /// Short human-readable label shown in logs.
    pub label: String,
    /// Longer description of what the step is meant to achieve.
    #[serde(default)]
    pub description: String,
    /// The action to perform, tagged by `type` with a `params` payload.
    #[serde(flatten)]
    pub action: PlanAction,
}

/// The action payload of a plan step.
///
/// Externally this serializes as `{"type": "research", "params": {...}}`,
/// matching the shape the planner agent emits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum PlanAction {
    /// Run the standard research flow as a nested sub-workflow.
    Research(ResearchParams),
    /// Embed text and upsert it into the vector store (fire-and-forget).
    VectorEmbed(EmbedParams),
}

/// Parameters for a research plan step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchParams {
    /// Main research query terms.
    #[serde(deserialize_with = "string_or_seq")]
    pub keywords: Vec<String>,
    /// Specific aspects to analyze (criterion strings, "Name: description").
    #[serde(deserialize_with = "string_or_seq")]
    pub criteria: Vec<String>,
}

/// Parameters for a vector-embed plan step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedParams {
    /// What text to embed.
    pub source: EmbedSource,
    /// Target vector index. Falls back to the configured default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}

/// What a vector-embed step should embed.
///
/// The reference is decided when the plan is generated, not guessed at
/// execution time: the executor substitutes the previous step's serialized
/// output only for the explicit `PreviousStepOutput` variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum EmbedSource {
    /// Embed this exact text.
    Literal { text: String },
    /// Embed the serialized output of the preceding plan step.
    PreviousStepOutput,
}

/// Deserialize either a single string or a sequence of strings into a Vec.
///
/// Planner output (and the original HTTP clients) sometimes send a bare
/// string where a list is expected.
fn string_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_step_wire_shape() {
        let step = PlanStep {
            id: "step-1".into(),
            label: "Initial Market Scan".into(),
            description: "Research the general market landscape".into(),
            action: PlanAction::Research(ResearchParams {
                keywords: vec!["AI in Healthcare market size".into()],
                criteria: vec!["Market Size".into(), "Key Players".into()],
            }),
        };
        let json = serde_json::to_string(&step).unwrap();
        assert!(json.contains("\"type\":\"research\""));
        assert!(json.contains("\"params\""));

        let parsed: PlanStep = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed.action, PlanAction::Research(_)));
    }

    #[test]
    fn test_embed_step_wire_shape() {
        let json = r#"{
            "id": "step-2",
            "label": "Save to Memory",
            "type": "vector_embed",
            "params": { "source": { "from": "previous_step_output" }, "index": "research-data" }
        }"#;
        let parsed: PlanStep = serde_json::from_str(json).unwrap();
        match parsed.action {
            PlanAction::VectorEmbed(params) => {
                assert_eq!(params.source, EmbedSource::PreviousStepOutput);
                assert_eq!(params.index.as_deref(), Some("research-data"));
            }
            other => panic!("expected vector_embed, got {other:?}"),
        }
    }

    #[test]
    fn test_embed_source_literal() {
        let json = r#"{"from": "literal", "text": "quarterly revenue summary"}"#;
        let parsed: EmbedSource = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed,
            EmbedSource::Literal {
                text: "quarterly revenue summary".into()
            }
        );
    }

    #[test]
    fn test_keywords_accept_bare_string() {
        let json = r#"{"keywords": "Berlin startups", "criteria": ["Funding"]}"#;
        let parsed: ResearchParams = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.keywords, vec!["Berlin startups"]);
        assert_eq!(parsed.criteria, vec!["Funding"]);
    }
}
