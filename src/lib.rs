//! Langomine - Speaking Practice Backend
//!
//! Accepts an uploaded voice recording, sends it to a Whisper ASR webservice for a
//! word-timed transcript, asks an LLM for IELTS-style band scores, and keeps the
//! result behind a small HTTP API.
//!
//! ## Features
//!
//! - **Transcription:** multipart upload to a Whisper ASR webservice with word timestamps
//! - **Scoring:** schema-constrained LLM feedback, model tier picked by requester country
//! - **Local-First:** SQLite storage for records, local directory for audio blobs
//! - **Soft-Delete:** deleted voices keep their id but lose audio and transcript
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a default config and start the API
//! langomine init
//! langomine serve
//!
//! # Submit a recording
//! curl -F file=@hi-there.mp3 -H 'CF-IPCountry: FR' http://127.0.0.1:8000/voices/
//! ```

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod logging;
pub mod scoring;
pub mod services;
pub mod storage;
pub mod transcription;
pub mod utils;

// Re-export commonly used types
pub use error::{ErrorCode, LangomineError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
