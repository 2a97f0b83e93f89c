use serde::{Deserialize, Serialize};

use super::TranscriptionError;

/// One recognised word with its timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
    pub probability: f64,
}

/// A time-bounded chunk of the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub words: Vec<WordTiming>,
}

impl Segment {
    /// Whole seconds between `start` and `end`, truncated. Never negative.
    pub fn duration_seconds(&self) -> u64 {
        let span = self.end - self.start;
        if span.is_finite() && span > 0.0 {
            span.trunc() as u64
        } else {
            0
        }
    }
}

/// Parsed ASR webservice payload. Unknown fields (`tokens`, `seek`, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    /// Top-level transcript text, independent of segment texts
    #[serde(rename = "text")]
    pub full_text: String,
    pub language: String,
    pub segments: Vec<Segment>,
}

impl TranscriptResult {
    /// Only the first segment feeds duration, word timings and scoring.
    pub fn first_segment(&self) -> Result<&Segment, TranscriptionError> {
        self.segments.first().ok_or(TranscriptionError::NoSegments)
    }
}
