//! Crate-level error type
//!
//! Every failure a voice operation can surface maps to one of these variants, and
//! each variant carries a stable [`ErrorCode`] that the HTTP layer puts on the wire.

use crate::db::StoreError;
use crate::scoring::ScoringError;
use crate::storage::StorageError;
use crate::transcription::TranscriptionError;
use serde::Serialize;

/// Stable machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    PayloadTooLarge,
    TranscriptionFailed,
    ScoringFailed,
    StorageFailed,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::TranscriptionFailed => "TRANSCRIPTION_FAILED",
            Self::ScoringFailed => "SCORING_FAILED",
            Self::StorageFailed => "STORAGE_FAILED",
            Self::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LangomineError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("upload too large: {0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl LangomineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::PayloadTooLarge(_) => ErrorCode::PayloadTooLarge,
            Self::Transcription(_) => ErrorCode::TranscriptionFailed,
            Self::Scoring(_) => ErrorCode::ScoringFailed,
            Self::Storage(_) => ErrorCode::StorageFailed,
            Self::Store(_) | Self::Config(_) => ErrorCode::Internal,
        }
    }

    pub fn voice_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("voice {}", id))
    }
}

pub type Result<T> = std::result::Result<T, LangomineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            LangomineError::voice_not_found("abc").code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            LangomineError::Validation("missing file".into()).code(),
            ErrorCode::ValidationError
        );
        assert_eq!(
            LangomineError::PayloadTooLarge("file".into()).code(),
            ErrorCode::PayloadTooLarge
        );
        assert_eq!(
            LangomineError::from(ScoringError::MissingApiKey).code(),
            ErrorCode::ScoringFailed
        );
        assert_eq!(
            LangomineError::from(TranscriptionError::NoSegments).code(),
            ErrorCode::TranscriptionFailed
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = LangomineError::voice_not_found("1234");
        assert_eq!(err.to_string(), "voice 1234 not found");
    }

    #[test]
    fn test_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::TranscriptionFailed).unwrap();
        assert_eq!(json, "\"TRANSCRIPTION_FAILED\"");
        assert_eq!(ErrorCode::ScoringFailed.to_string(), "SCORING_FAILED");
    }
}
