//! Research pipeline input types and correlated signals.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Criterion
// ---------------------------------------------------------------------------

/// One named research question the pipeline must attempt to answer.
///
/// Criteria travel over the wire as plain strings of the form
/// `"Name: description"`; the part before the first colon is the display
/// name used in progress logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Criterion {
    pub name: String,
    pub description: String,
}

impl From<String> for Criterion {
    fn from(raw: String) -> Self {
        match raw.split_once(':') {
            Some((name, _)) => Self {
                name: name.trim().to_string(),
                description: raw,
            },
            None => Self {
                name: raw.clone(),
                description: raw,
            },
        }
    }
}

impl From<Criterion> for String {
    fn from(c: Criterion) -> String {
        c.description
    }
}

impl From<&str> for Criterion {
    fn from(raw: &str) -> Self {
        Criterion::from(raw.to_string())
    }
}

// ---------------------------------------------------------------------------
// Pipeline inputs
// ---------------------------------------------------------------------------

/// Input to the standard research flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub job_id: String,
    pub keywords: Vec<String>,
    pub criteria: Vec<Criterion>,
    pub primary_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_model: Option<String>,
}

/// Input to the extended (human-in-the-loop) research flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendedResearchRequest {
    pub job_id: String,
    pub keywords: Vec<String>,
    pub criteria: Vec<Criterion>,
    /// When present, selection is skipped and extraction is scoped to this URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub primary_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_model: Option<String>,
}

// ---------------------------------------------------------------------------
// Correlated signals
// ---------------------------------------------------------------------------

/// External signal resuming a paused extended-research job.
///
/// Correlated by `job_id`: a signal for one job can never resume another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSignal {
    pub job_id: String,
    /// URLs the user picked from the candidate links.
    pub selected_links: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criterion_parses_name_before_colon() {
        let c = Criterion::from("Population: current city population");
        assert_eq!(c.name, "Population");
        assert_eq!(c.description, "Population: current city population");
    }

    #[test]
    fn test_criterion_without_colon_uses_whole_string() {
        let c = Criterion::from("General overview");
        assert_eq!(c.name, "General overview");
    }

    #[test]
    fn test_criterion_serde_as_plain_string() {
        let json = r#"["Population: people living there", "Weather"]"#;
        let parsed: Vec<Criterion> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed[0].name, "Population");
        assert_eq!(parsed[1].name, "Weather");

        let back = serde_json::to_string(&parsed).unwrap();
        assert_eq!(back, json.replace(", ", ","));
    }

    #[test]
    fn test_research_request_roundtrip() {
        let req = ResearchRequest {
            job_id: "job-1".into(),
            keywords: vec!["Lisbon".into()],
            criteria: vec!["Population: city population".into()],
            primary_model: "llama-3.3-70b-versatile".into(),
            fallback_model: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("fallback_model"));
        let parsed: ResearchRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.criteria[0].name, "Population");
    }
}
