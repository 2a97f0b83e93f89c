//! Transcription Module
//!
//! Speech-to-text through a Whisper ASR webservice. The client uploads the audio as
//! multipart form data and asks for JSON output with word-level timestamps.

mod client;
mod types;

pub use client::WhisperClient;
pub use types::{Segment, TranscriptResult, WordTiming};

use async_trait::async_trait;
use bytes::Bytes;

/// Errors from the transcription service
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("failed to build transcription client: {0}")]
    Client(String),

    #[error("failed to reach transcription service: {0}")]
    Request(#[from] reqwest::Error),

    #[error("transcription service error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse transcription response: {0}")]
    Parse(String),

    #[error("transcription contains no segments")]
    NoSegments,
}

/// Something that turns audio bytes into a timed transcript
///
/// `audio` is reference-counted so callers can keep the recording without copying it.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        audio: Bytes,
        filename: &str,
    ) -> Result<TranscriptResult, TranscriptionError>;
}
