//! Row models for the record store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::AnalysisDocument;
use crate::transcription::WordTiming;

/// Lifecycle of a voice record. `Deleted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Active,
    Deleted { at: DateTime<Utc> },
}

impl VoiceState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Active => None,
            Self::Deleted { at } => Some(*at),
        }
    }

    pub(crate) fn from_column(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            None => Self::Active,
            Some(at) => Self::Deleted { at },
        }
    }
}

/// A persisted voice submission
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceRecord {
    pub id: Uuid,
    pub duration_seconds: u64,
    /// Blob store key of the uploaded audio; cleared on delete
    pub audio_blob_ref: Option<String>,
    pub language: Option<String>,
    pub transcript_text: Option<String>,
    pub word_timings: Option<Vec<WordTiming>>,
    pub request_country: Option<String>,
    pub analysis: Option<AnalysisDocument>,
    pub created_at: DateTime<Utc>,
    pub state: VoiceState,
}

impl VoiceRecord {
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.state.deleted_at()
    }
}

/// Fields gathered by a submission, ready to insert
#[derive(Debug, Clone, Default)]
pub struct NewVoice {
    pub duration_seconds: u64,
    pub audio_blob_ref: Option<String>,
    pub language: Option<String>,
    pub transcript_text: Option<String>,
    pub word_timings: Option<Vec<WordTiming>>,
    pub request_country: Option<String>,
    pub analysis: Option<AnalysisDocument>,
}

/// A speaking-practice prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    pub id: i64,
    pub text: String,
}
