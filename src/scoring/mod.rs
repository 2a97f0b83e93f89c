//! Scoring Module
//!
//! Sends the first transcript segment to an OpenAI-compatible chat completion
//! endpoint with a JSON-schema response format and turns the reply into an
//! [`AnalysisDocument`]. The model tier depends on the caller's country.

mod client;
pub mod schema;
mod tier;
mod types;

pub use client::OpenAiScorer;
pub use tier::{ModelSelector, ModelTier};
pub use types::{
    AnalysisDocument, Assessment, FluencyAndCoherence, GrammaticalRangeAndAccuracy,
    LexicalResource, OverallAssessment, PhoneticAnalysis, Pronunciation, StructureAnalysis,
    VocabularyAnalysis,
};

use async_trait::async_trait;

use crate::transcription::Segment;
use schema::Violation;

/// Errors from the scoring provider
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("no scoring API key configured (set OPENAI_API_KEY)")]
    MissingApiKey,

    #[error("failed to build scoring client: {0}")]
    Client(String),

    #[error("failed to reach scoring provider: {0}")]
    Request(#[from] reqwest::Error),

    #[error("scoring provider error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("malformed scoring response: {0}")]
    MalformedResponse(String),

    #[error("scoring model refused: {0}")]
    Refusal(String),

    #[error("scoring response failed schema validation: {}", join_violations(.0))]
    SchemaViolation(Vec<Violation>),
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Something that scores a transcript segment
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(
        &self,
        segment: &Segment,
        country_code: &str,
    ) -> Result<AnalysisDocument, ScoringError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_violation_message() {
        let err = ScoringError::SchemaViolation(vec![
            Violation {
                path: "$.pronunciation".to_string(),
                reason: "missing required field".to_string(),
            },
            Violation {
                path: "$.overall_assessment.band_score".to_string(),
                reason: "9.5 is above maximum 9".to_string(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "scoring response failed schema validation: $.pronunciation: missing required field; \
             $.overall_assessment.band_score: 9.5 is above maximum 9"
        );
    }
}
