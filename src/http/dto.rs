//! Wire shapes for the HTTP API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::VoiceRecord;
use crate::error::ErrorCode;
use crate::scoring::AnalysisDocument;
use crate::transcription::WordTiming;

/// Serialized voice record. The blob reference and lifecycle state stay internal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceResponse {
    pub id: Uuid,
    pub duration_seconds: u64,
    pub transcript_text: Option<String>,
    pub language: Option<String>,
    pub request_country: Option<String>,
    pub word_timings: Option<Vec<WordTiming>>,
    pub created_at: DateTime<Utc>,
    pub analysis: Option<AnalysisDocument>,
}

impl From<VoiceRecord> for VoiceResponse {
    fn from(record: VoiceRecord) -> Self {
        Self {
            id: record.id,
            duration_seconds: record.duration_seconds,
            transcript_text: record.transcript_text,
            language: record.language,
            request_country: record.request_country,
            word_timings: record.word_timings,
            created_at: record.created_at,
            analysis: record.analysis,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_duration_s: u64,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
}
