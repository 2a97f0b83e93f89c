//! Whisper ASR webservice client
//!
//! Talks to the `/asr` endpoint of an `openai-whisper-asr-webservice` style server:
//! the audio goes in the `audio_file` multipart field and the query string asks for
//! a JSON transcript with word timestamps.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;

use super::{Transcriber, TranscriptResult, TranscriptionError};
use crate::config::TranscriptionConfig;
use crate::utils::error_snippet;

const ASR_PATH: &str = "/asr";
const ASR_QUERY: [(&str, &str); 4] = [
    ("encode", "true"),
    ("task", "transcribe"),
    ("word_timestamps", "true"),
    ("output", "json"),
];
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the ASR webservice
#[derive(Clone, Debug)]
pub struct WhisperClient {
    client: Client,
    host: String,
}

impl WhisperClient {
    pub fn new(config: &TranscriptionConfig) -> Result<Self, TranscriptionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TranscriptionError::Client(e.to_string()))?;

        Ok(Self::with_client(&config.host, client))
    }

    /// Create with custom HTTP client
    pub fn with_client(host: &str, client: Client) -> Self {
        Self {
            client,
            host: host.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.host, ASR_PATH)
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(
        &self,
        audio: Bytes,
        filename: &str,
    ) -> Result<TranscriptResult, TranscriptionError> {
        let size = audio.len();
        tracing::info!("Transcribing {} ({} bytes)", filename, size);

        let file_part = reqwest::multipart::Part::stream_with_length(audio, size as u64)
            .file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("audio_file", file_part);

        let response = self
            .client
            .post(self.endpoint())
            .query(&ASR_QUERY)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Transcription service returned {}", status);
            return Err(TranscriptionError::Api {
                status: status.as_u16(),
                body: error_snippet(&body),
            });
        }

        let body = response.text().await?;
        let result: TranscriptResult = serde_json::from_str(&body)
            .map_err(|e| TranscriptionError::Parse(e.to_string()))?;

        tracing::info!(
            "Transcribed {} chars, language={}, segments={}",
            result.full_text.len(),
            result.language,
            result.segments.len()
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const HI_THERE: &str = r#"{"text": " Hi there!", "segments": [{"id": 0, "seek": 0, "start": 0.0, "end": 0.54, "text": " Hi there!", "words": [{"word": " Hi", "start": 0.0, "end": 0.32, "probability": 0.55}, {"word": " there!", "start": 0.32, "end": 0.54, "probability": 0.91}]}], "language": "en"}"#;

    fn client_for(server: &mockito::Server) -> WhisperClient {
        WhisperClient::with_client(&server.url(), Client::new())
    }

    fn asr_query() -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("encode".into(), "true".into()),
            Matcher::UrlEncoded("task".into(), "transcribe".into()),
            Matcher::UrlEncoded("word_timestamps".into(), "true".into()),
            Matcher::UrlEncoded("output".into(), "json".into()),
        ])
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = WhisperClient::with_client("http://asr:9000/", Client::new());
        assert_eq!(client.endpoint(), "http://asr:9000/asr");
    }

    #[test]
    fn test_new_from_config() {
        let config = TranscriptionConfig {
            host: "http://localhost:9000".to_string(),
            timeout_secs: 5,
        };
        let client = WhisperClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9000/asr");
    }

    #[tokio::test]
    async fn test_transcribe_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/asr")
            .match_query(asr_query())
            .match_body(Matcher::Regex(
                r#"name="audio_file"; filename="hi-there.mp3""#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(HI_THERE)
            .create_async()
            .await;

        let result = client_for(&server)
            .transcribe(Bytes::from_static(b"ID3-fake-audio"), "hi-there.mp3")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.full_text, " Hi there!");
        assert_eq!(result.language, "en");
        assert_eq!(result.first_segment().unwrap().words.len(), 2);
    }

    #[tokio::test]
    async fn test_transcribe_server_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/asr")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("Internal Server Error")
            .create_async()
            .await;

        let err = client_for(&server)
            .transcribe(Bytes::from_static(b"audio"), "a.wav")
            .await
            .unwrap_err();

        mock.assert_async().await;
        match err {
            TranscriptionError::Api { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "Internal Server Error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transcribe_malformed_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/asr")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not json at all")
            .create_async()
            .await;

        let err = client_for(&server)
            .transcribe(Bytes::from_static(b"audio"), "a.wav")
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, TranscriptionError::Parse(_)));
        assert!(err.to_string().contains("parse"));
    }

    #[tokio::test]
    async fn test_transcribe_missing_segments_field() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/asr")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"text": "hello", "language": "en"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .transcribe(Bytes::from_static(b"audio"), "a.wav")
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptionError::Parse(_)));
    }

    #[tokio::test]
    async fn test_transcribe_unreachable() {
        let client = WhisperClient::with_client("http://127.0.0.1:1", Client::new());
        let err = client.transcribe(Bytes::from_static(b"audio"), "a.wav").await.unwrap_err();
        assert!(matches!(err, TranscriptionError::Request(_)));
    }
}
