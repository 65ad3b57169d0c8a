//! OpenRouter chat-completions client used as the content evaluator

use async_trait::async_trait;
use evalio_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::content_schema::{parse_content_evaluation, RESPONSE_SCHEMA};
use super::providers::{ContentEvaluation, ContentEvaluationRequest, ContentEvaluator};
use super::EvaluationError;
use crate::config::OpenRouterSettings;

const USER_AGENT: &str = concat!("evalio-ae/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub fn system_prompt() -> String {
    [
        "You evaluate interview answers.",
        "Return ONLY valid JSON.",
        "No markdown, no explanation, no backticks.",
        "Required schema:",
        RESPONSE_SCHEMA,
        "All score fields must be numbers from 0 to 100.",
    ]
    .join("\n")
}

pub fn user_prompt(request: &ContentEvaluationRequest) -> String {
    format!(
        "Interview Type: {}\nDifficulty: {}\nQuestion: {}\nCandidate Answer:\n{}",
        request.interview_type, request.difficulty, request.question, request.transcript
    )
}

/// First choice's message content
fn message_content(body: &str) -> std::result::Result<String, EvaluationError> {
    let response: ChatResponse = serde_json::from_str(body).map_err(|e| {
        EvaluationError::EvaluationParseError(format!("unreadable completion response: {}", e))
    })?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| {
            EvaluationError::EvaluationParseError(
                "evaluation provider returned empty content".to_string(),
            )
        })
}

/// OpenRouter API client
pub struct OpenRouterClient {
    http_client: reqwest::Client,
    settings: OpenRouterSettings,
}

impl OpenRouterClient {
    pub fn new(settings: OpenRouterSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::Config(format!("Failed to build OpenRouter HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            settings,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ContentEvaluator for OpenRouterClient {
    async fn evaluate(
        &self,
        request: &ContentEvaluationRequest,
    ) -> std::result::Result<ContentEvaluation, EvaluationError> {
        let system = system_prompt();
        let user = user_prompt(request);
        let payload = ChatRequest {
            model: &self.settings.model,
            temperature: TEMPERATURE,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
        };

        tracing::debug!(
            model = %self.settings.model,
            transcript_chars = request.transcript.len(),
            "Requesting content evaluation"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EvaluationError::EvaluationFailed(format!("network error: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EvaluationError::EvaluationFailed(format!("network error: {}", e)))?;

        if !status.is_success() {
            return Err(EvaluationError::EvaluationFailed(format!(
                "OpenRouter evaluation request failed: {} {}",
                status.as_u16(),
                body
            )));
        }

        let content = message_content(&body)?;
        parse_content_evaluation(&content)
    }
}
