//! OpenAI-compatible scoring client
//!
//! One chat completion per submission, no retries. The reply content must be a
//! JSON object that passes [`analysis_schema`](super::schema::analysis_schema).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::schema::{SchemaNode, analysis_schema, response_format};
use super::{AnalysisDocument, Assessment, ModelSelector, Scorer, ScoringError};
use crate::config::ScoringConfig;
use crate::transcription::Segment;
use crate::utils::error_snippet;

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: Value,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Scorer backed by an OpenAI-compatible API
#[derive(Clone)]
pub struct OpenAiScorer {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    selector: ModelSelector,
    schema: SchemaNode,
}

impl OpenAiScorer {
    pub fn new(config: &ScoringConfig) -> Result<Self, ScoringError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ScoringError::Client(e.to_string()))?;

        Ok(Self::with_client(config, client))
    }

    /// Create with custom HTTP client
    pub fn with_client(config: &ScoringConfig, client: Client) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            selector: ModelSelector::from_config(config),
            schema: analysis_schema(),
        }
    }

    pub fn selector(&self) -> &ModelSelector {
        &self.selector
    }

    fn build_prompt(segment: &Segment) -> Result<String, ScoringError> {
        let content = serde_json::to_string(segment)
            .map_err(|e| ScoringError::MalformedResponse(e.to_string()))?;
        Ok(format!("Analyze this speech text in detail:\n\n{}", content))
    }

    /// Validate raw reply content and convert it into the typed document
    fn parse_content(&self, content: &str, model: &str) -> Result<AnalysisDocument, ScoringError> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| ScoringError::MalformedResponse(format!("content is not JSON: {}", e)))?;

        self.schema
            .validate(&value)
            .map_err(ScoringError::SchemaViolation)?;

        let assessment: Assessment = serde_json::from_value(value)
            .map_err(|e| ScoringError::MalformedResponse(e.to_string()))?;

        Ok(AnalysisDocument::new(assessment, model))
    }
}

#[async_trait]
impl Scorer for OpenAiScorer {
    async fn score(
        &self,
        segment: &Segment,
        country_code: &str,
    ) -> Result<AnalysisDocument, ScoringError> {
        let api_key = self.api_key.as_deref().ok_or(ScoringError::MissingApiKey)?;
        let tier = self.selector.tier_for(country_code);
        let model = self.selector.model(tier);

        tracing::info!(
            "Scoring request: model={}, tier={:?}, country={:?}",
            model,
            tier,
            country_code
        );

        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: Self::build_prompt(segment)?,
            }],
            response_format: response_format(&self.schema),
        };

        let response = self
            .client
            .post(format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Scoring provider returned {}", status);
            return Err(ScoringError::Api {
                status: status.as_u16(),
                body: error_snippet(&body),
            });
        }

        let body = response.text().await?;
        let completion: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ScoringError::MalformedResponse(e.to_string()))?;

        let message = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| ScoringError::MalformedResponse("no choices returned".to_string()))?;

        if let Some(refusal) = message.refusal {
            return Err(ScoringError::Refusal(refusal));
        }

        let content = message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ScoringError::MalformedResponse("empty message content".to_string()))?;

        let analysis = self.parse_content(&content, model)?;
        tracing::info!(
            "Scoring complete: model={}, overall band={}",
            model,
            analysis.overall_band()
        );
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::fixtures::sample_assessment_json;
    use crate::transcription::WordTiming;
    use mockito::Matcher;
    use serde_json::json;

    fn segment() -> Segment {
        Segment {
            text: " Hi there!".to_string(),
            start: 0.0,
            end: 0.54,
            words: vec![WordTiming {
                word: " Hi".to_string(),
                start: 0.0,
                end: 0.32,
                probability: 0.55,
            }],
        }
    }

    fn scorer_for(server: &mockito::Server) -> OpenAiScorer {
        let config = ScoringConfig {
            api_key: Some("test-openai-key".to_string()),
            base_url: server.url(),
            ..Default::default()
        };
        OpenAiScorer::with_client(&config, Client::new())
    }

    fn completion(content: &str) -> String {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content, "refusal": null},
                "finish_reason": "stop"
            }]
        })
        .to_string()
    }

    #[test]
    fn test_prompt_contains_segment_json() {
        let prompt = OpenAiScorer::build_prompt(&segment()).unwrap();
        assert!(prompt.starts_with("Analyze this speech text in detail:\n\n"));
        assert!(prompt.contains(r#""text":" Hi there!""#));
        assert!(prompt.contains(r#""word":" Hi""#));
    }

    #[tokio::test]
    async fn test_premium_country_uses_premium_model() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-openai-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o",
                "response_format": {"type": "json_schema", "json_schema": {"name": "ielts_speech_analysis"}}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion(&sample_assessment_json().to_string()))
            .create_async()
            .await;

        let analysis = scorer_for(&server).score(&segment(), "FR").await.unwrap();

        mock.assert_async().await;
        assert_eq!(analysis.model_used, "gpt-4o");
        assert_eq!(analysis.assessment.fluency_and_coherence.band_score, 7.0);
    }

    #[tokio::test]
    async fn test_other_country_uses_standard_model() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(json!({"model": "gpt-4o-mini"})))
            .with_status(200)
            .with_body(completion(&sample_assessment_json().to_string()))
            .create_async()
            .await;

        let analysis = scorer_for(&server).score(&segment(), "US").await.unwrap();

        mock.assert_async().await;
        assert_eq!(analysis.model_used, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_missing_section_rejected() {
        let mut doc = sample_assessment_json();
        doc.as_object_mut().unwrap().remove("pronunciation");

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(completion(&doc.to_string()))
            .create_async()
            .await;

        let err = scorer_for(&server).score(&segment(), "FR").await.unwrap_err();
        match err {
            ScoringError::SchemaViolation(violations) => {
                assert_eq!(violations[0].path, "$.pronunciation");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_content_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(completion("Sure! Here is your analysis"))
            .create_async()
            .await;

        let err = scorer_for(&server).score(&segment(), "").await.unwrap_err();
        assert!(matches!(err, ScoringError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_refusal_surfaces() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": null, "refusal": "I can't help with that."}}]
        });
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let err = scorer_for(&server).score(&segment(), "FR").await.unwrap_err();
        assert!(matches!(err, ScoringError::Refusal(_)));
    }

    #[tokio::test]
    async fn test_empty_choices_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let err = scorer_for(&server).score(&segment(), "FR").await.unwrap_err();
        assert!(matches!(err, ScoringError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_api_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(r#"{"error": {"message": "Rate limit exceeded"}}"#)
            .expect(1)
            .create_async()
            .await;

        let err = scorer_for(&server).score(&segment(), "FR").await.unwrap_err();

        // Fail fast: exactly one call, no retry
        mock.assert_async().await;
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let scorer = OpenAiScorer::with_client(&ScoringConfig::default(), Client::new());
        let err = scorer.score(&segment(), "FR").await.unwrap_err();
        assert!(matches!(err, ScoringError::MissingApiKey));
    }
}
