//! Typed scoring document
//!
//! Mirrors the response schema in [`super::schema`]. Provider output is validated
//! against that schema before it is deserialized into these types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluencyAndCoherence {
    pub band_score: f64,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub detailed_feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyAnalysis {
    pub sophisticated_terms: Vec<String>,
    pub collocations: Vec<String>,
    pub idiomatic_expressions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalResource {
    pub band_score: f64,
    pub vocabulary_analysis: VocabularyAnalysis,
    pub detailed_feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureAnalysis {
    pub complex_structures: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammaticalRangeAndAccuracy {
    pub band_score: f64,
    pub structure_analysis: StructureAnalysis,
    pub detailed_feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneticAnalysis {
    /// 0.0 - 1.0
    pub clarity_score: f64,
    pub problem_sounds: Vec<String>,
    pub intonation_patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pronunciation {
    pub band_score: f64,
    pub phonetic_analysis: PhoneticAnalysis,
    pub detailed_feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallAssessment {
    pub band_score: f64,
    pub key_strengths: Vec<String>,
    pub priority_improvements: Vec<String>,
    pub summary: String,
}

/// The five scored sections, exactly as the model returns them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub fluency_and_coherence: FluencyAndCoherence,
    pub lexical_resource: LexicalResource,
    pub grammatical_range_and_accuracy: GrammaticalRangeAndAccuracy,
    pub pronunciation: Pronunciation,
    pub overall_assessment: OverallAssessment,
}

/// Stored analysis: the assessment plus the model that produced it.
///
/// Serializes flat, i.e. `{"fluency_and_coherence": ..., ..., "model_used": "gpt-4o"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDocument {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub model_used: String,
}

impl AnalysisDocument {
    pub fn new(assessment: Assessment, model_used: impl Into<String>) -> Self {
        Self {
            assessment,
            model_used: model_used.into(),
        }
    }

    pub fn overall_band(&self) -> f64 {
        self.assessment.overall_assessment.band_score
    }
}
