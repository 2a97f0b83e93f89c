//! Voice submission pipeline
//!
//! `submit` runs transcribe -> measure -> score -> store blob -> insert record, in
//! that order, and stops at the first failure. Nothing is persisted unless every
//! step succeeds.

use bytes::Bytes;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{NewVoice, VoiceRecord, VoiceRepository};
use crate::error::{LangomineError, Result};
use crate::scoring::Scorer;
use crate::services::ServiceContext;
use crate::storage::BlobStore;
use crate::transcription::Transcriber;

/// Audio received from a client. Cloning shares the buffer.
#[derive(Debug, Clone)]
pub struct VoiceUpload {
    pub bytes: Bytes,
    pub filename: String,
}

impl VoiceUpload {
    pub fn new(bytes: impl Into<Bytes>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
        }
    }
}

#[derive(Clone)]
pub struct VoiceService {
    voices: VoiceRepository,
    blobs: Arc<dyn BlobStore>,
    transcriber: Arc<dyn Transcriber>,
    scorer: Arc<dyn Scorer>,
}

impl VoiceService {
    pub fn new(
        context: ServiceContext,
        blobs: Arc<dyn BlobStore>,
        transcriber: Arc<dyn Transcriber>,
        scorer: Arc<dyn Scorer>,
    ) -> Self {
        Self {
            voices: VoiceRepository::new(context.pool().clone()),
            blobs,
            transcriber,
            scorer,
        }
    }

    /// Transcribe, score and persist one recording
    pub async fn submit(
        &self,
        upload: VoiceUpload,
        request_country: Option<String>,
    ) -> Result<VoiceRecord> {
        if upload.bytes.is_empty() {
            return Err(LangomineError::Validation(
                "uploaded file is empty".to_string(),
            ));
        }

        let request_country = request_country
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let transcript = self
            .transcriber
            .transcribe(upload.bytes.clone(), &upload.filename)
            .await
            .inspect_err(|e| tracing::error!("Transcription failed: {}", e))?;

        let segment = transcript.first_segment()?;
        if transcript.segments.len() > 1 {
            tracing::debug!(
                "Transcript has {} segments, only the first is used",
                transcript.segments.len()
            );
        }
        let duration_seconds = segment.duration_seconds();

        let analysis = self
            .scorer
            .score(segment, request_country.as_deref().unwrap_or_default())
            .await
            .inspect_err(|e| tracing::error!("Scoring failed: {}", e))?;

        let blob_key = self.blobs.put(&upload.filename, &upload.bytes).await?;

        let new_voice = NewVoice {
            duration_seconds,
            audio_blob_ref: Some(blob_key.clone()),
            language: Some(transcript.language.clone()),
            transcript_text: Some(transcript.full_text.clone()),
            word_timings: Some(segment.words.clone()),
            request_country,
            analysis: Some(analysis),
        };

        let record = match self.voices.create(new_voice).await {
            Ok(record) => record,
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&blob_key).await {
                    tracing::warn!("Failed to remove orphaned blob {}: {}", blob_key, cleanup);
                }
                return Err(e.into());
            }
        };

        tracing::info!(
            "Created voice {} ({}s, language={})",
            record.id,
            record.duration_seconds,
            transcript.language
        );
        Ok(record)
    }

    /// Active record by id
    pub async fn fetch(&self, id: Uuid) -> Result<VoiceRecord> {
        self.voices
            .get_active(id)
            .await?
            .ok_or_else(|| LangomineError::voice_not_found(id))
    }

    /// Soft-delete an active record and release its audio
    pub async fn remove(&self, id: Uuid) -> Result<VoiceRecord> {
        let deleted = self
            .voices
            .soft_delete(id)
            .await?
            .ok_or_else(|| LangomineError::voice_not_found(id))?;

        if let Some(key) = deleted.released_blob
            && let Err(e) = self.blobs.delete(&key).await
        {
            tracing::warn!("Voice {} deleted but blob {} was not removed: {}", id, key, e);
        }

        tracing::info!("Deleted voice {}", id);
        Ok(deleted.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::error::ErrorCode;
    use crate::scoring::fixtures::sample_analysis;
    use crate::scoring::schema::Violation;
    use crate::scoring::{AnalysisDocument, ModelSelector, ScoringError};
    use crate::storage::MemoryBlobStore;
    use crate::transcription::{Segment, TranscriptResult, TranscriptionError, WordTiming};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns one fixed segment and keeps the audio it was handed
    struct MockTranscriber {
        start: f64,
        end: f64,
        fail: bool,
        received: Mutex<Vec<Bytes>>,
    }

    impl MockTranscriber {
        fn lasting(start: f64, end: f64) -> Self {
            Self {
                start,
                end,
                fail: false,
                received: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::lasting(0.0, 0.0)
            }
        }
    }

    #[async_trait]
    impl Transcriber for MockTranscriber {
        async fn transcribe(
            &self,
            audio: Bytes,
            _filename: &str,
        ) -> std::result::Result<TranscriptResult, TranscriptionError> {
            self.received.lock().unwrap().push(audio);
            if self.fail {
                return Err(TranscriptionError::Api {
                    status: 500,
                    body: "model not loaded".to_string(),
                });
            }
            Ok(TranscriptResult {
                full_text: " Hi there!".to_string(),
                language: "en".to_string(),
                segments: vec![Segment {
                    text: " Hi there!".to_string(),
                    start: self.start,
                    end: self.end,
                    words: vec![WordTiming {
                        word: " Hi".to_string(),
                        start: self.start,
                        end: self.end,
                        probability: 0.9,
                    }],
                }],
            })
        }
    }

    /// Picks the model like the real client and records the country it saw
    struct MockScorer {
        selector: ModelSelector,
        reject: bool,
        seen: Mutex<Vec<String>>,
    }

    impl MockScorer {
        fn new() -> Self {
            Self {
                selector: ModelSelector::default(),
                reject: false,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn rejecting() -> Self {
            Self {
                reject: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl Scorer for MockScorer {
        async fn score(
            &self,
            _segment: &Segment,
            country_code: &str,
        ) -> std::result::Result<AnalysisDocument, ScoringError> {
            self.seen.lock().unwrap().push(country_code.to_string());
            if self.reject {
                return Err(ScoringError::SchemaViolation(vec![Violation {
                    path: "$.pronunciation".to_string(),
                    reason: "missing required field".to_string(),
                }]));
            }
            Ok(sample_analysis(self.selector.model_for(country_code)))
        }
    }

    struct Fixture {
        service: VoiceService,
        blobs: Arc<MemoryBlobStore>,
        transcriber: Arc<MockTranscriber>,
        scorer: Arc<MockScorer>,
        repo: VoiceRepository,
    }

    async fn fixture(transcriber: MockTranscriber, scorer: MockScorer) -> Fixture {
        let db = Database::connect_in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        let context = ServiceContext::new(db.pool().clone());
        let blobs = Arc::new(MemoryBlobStore::new());
        let transcriber = Arc::new(transcriber);
        let scorer = Arc::new(scorer);
        let service = VoiceService::new(
            context.clone(),
            blobs.clone(),
            transcriber.clone(),
            scorer.clone(),
        );
        Fixture {
            service,
            blobs,
            transcriber,
            scorer,
            repo: VoiceRepository::new(context.pool().clone()),
        }
    }

    fn upload() -> VoiceUpload {
        VoiceUpload::new(Bytes::from_static(b"fake mp3"), "hi-there.mp3")
    }

    #[tokio::test]
    async fn test_submit_premium_country() {
        let f = fixture(MockTranscriber::lasting(0.0, 30.0), MockScorer::new()).await;

        let record = f
            .service
            .submit(upload(), Some("FR".to_string()))
            .await
            .unwrap();

        assert!(record.is_active());
        assert_eq!(record.duration_seconds, 30);
        assert_eq!(record.request_country.as_deref(), Some("FR"));
        assert_eq!(record.language.as_deref(), Some("en"));
        assert_eq!(record.transcript_text.as_deref(), Some(" Hi there!"));
        assert_eq!(record.word_timings.as_ref().map(Vec::len), Some(1));
        assert_eq!(record.analysis.as_ref().unwrap().model_used, "gpt-4o");

        let key = record.audio_blob_ref.clone().unwrap();
        assert!(key.starts_with("voices/") && key.ends_with(".mp3"));
        assert!(f.blobs.contains(&key));

        assert_eq!(f.service.fetch(record.id).await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_submit_hands_audio_over_without_copying() {
        let f = fixture(MockTranscriber::lasting(0.0, 2.0), MockScorer::new()).await;
        let upload = VoiceUpload::new(vec![7u8; 4096], "long.wav");
        let original = upload.bytes.as_ptr();

        let record = f.service.submit(upload, None).await.unwrap();

        let received = f.transcriber.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].len(), 4096);
        assert_eq!(received[0].as_ptr(), original);
        assert!(f.blobs.contains(record.audio_blob_ref.as_deref().unwrap()));
    }

    #[tokio::test]
    async fn test_submit_logs_transcription_once() {
        use crate::logging::capture::LogCapture;
        use crate::transcription::WhisperClient;

        let mut asr = mockito::Server::new_async().await;
        let _asr = asr
            .mock("POST", "/asr")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"text": " Hi", "language": "en", "segments": [{"start": 0.0, "end": 3.2, "text": " Hi", "words": []}]}"#,
            )
            .create_async()
            .await;

        let db = Database::connect_in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        let service = VoiceService::new(
            ServiceContext::new(db.pool().clone()),
            Arc::new(MemoryBlobStore::new()),
            Arc::new(WhisperClient::with_client(&asr.url(), reqwest::Client::new())),
            Arc::new(MockScorer::new()),
        );

        let logs = LogCapture::default();
        let _guard = logs.install();
        let record = service.submit(upload(), None).await.unwrap();

        assert_eq!(record.duration_seconds, 3);
        assert_eq!(logs.count("Transcribing hi-there.mp3"), 1);
    }

    #[tokio::test]
    async fn test_submit_without_country_uses_standard_model() {
        let f = fixture(MockTranscriber::lasting(0.0, 0.54), MockScorer::new()).await;

        let record = f.service.submit(upload(), None).await.unwrap();

        assert_eq!(record.duration_seconds, 0);
        assert_eq!(record.request_country, None);
        assert_eq!(record.analysis.unwrap().model_used, "gpt-4o-mini");
        assert_eq!(f.scorer.seen.lock().unwrap().as_slice(), [""]);
    }

    #[tokio::test]
    async fn test_blank_country_header_is_none() {
        let f = fixture(MockTranscriber::lasting(0.0, 1.0), MockScorer::new()).await;
        let record = f
            .service
            .submit(upload(), Some("  ".to_string()))
            .await
            .unwrap();
        assert_eq!(record.request_country, None);
    }

    #[tokio::test]
    async fn test_transcription_failure_persists_nothing() {
        let f = fixture(MockTranscriber::failing(), MockScorer::new()).await;

        let err = f.service.submit(upload(), None).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::TranscriptionFailed);
        assert!(f.scorer.seen.lock().unwrap().is_empty());
        assert_eq!(f.repo.count_all().await.unwrap(), 0);
        assert!(f.blobs.is_empty());
    }

    #[tokio::test]
    async fn test_scoring_failure_persists_nothing() {
        let f = fixture(
            MockTranscriber::lasting(0.0, 30.0),
            MockScorer::rejecting(),
        )
        .await;

        let err = f
            .service
            .submit(upload(), Some("FR".to_string()))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::ScoringFailed);
        assert_eq!(f.repo.count_all().await.unwrap(), 0);
        assert!(f.blobs.is_empty());
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let f = fixture(MockTranscriber::lasting(0.0, 1.0), MockScorer::new()).await;
        let err = f
            .service
            .submit(VoiceUpload::new(Bytes::new(), "empty.mp3"), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_remove_clears_content_and_blob() {
        let f = fixture(MockTranscriber::lasting(0.0, 30.0), MockScorer::new()).await;
        let record = f
            .service
            .submit(upload(), Some("DE".to_string()))
            .await
            .unwrap();
        let key = record.audio_blob_ref.clone().unwrap();

        let deleted = f.service.remove(record.id).await.unwrap();

        assert!(!deleted.is_active());
        assert!(deleted.deleted_at().is_some());
        assert_eq!(deleted.audio_blob_ref, None);
        assert_eq!(deleted.transcript_text, None);
        assert_eq!(deleted.word_timings, None);
        assert_eq!(deleted.created_at, record.created_at);
        assert!(!f.blobs.contains(&key));

        // Deleted is terminal: reads and a second delete both miss
        assert_eq!(
            f.service.fetch(record.id).await.unwrap_err().code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            f.service.remove(record.id).await.unwrap_err().code(),
            ErrorCode::NotFound
        );
    }

    #[tokio::test]
    async fn test_unknown_id_not_found() {
        let f = fixture(MockTranscriber::lasting(0.0, 1.0), MockScorer::new()).await;
        let id = Uuid::new_v4();
        let err = f.service.fetch(id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.to_string(), format!("voice {} not found", id));
    }
}
