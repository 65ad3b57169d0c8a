//! Deepgram client (speech-to-text and text-to-speech)
//!
//! Call deadlines are applied by the caller through `providers::with_timeout`;
//! this client only bounds connection setup.

use async_trait::async_trait;
use evalio_common::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

use super::providers::{SpeechSynthesizer, Transcriber, Transcription};
use super::EvaluationError;
use crate::config::DeepgramSettings;

const USER_AGENT: &str = concat!("evalio-ae/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_AUDIO_MIME: &str = "audio/webm";

#[derive(Debug, Default, Deserialize)]
struct ListenResponse {
    #[serde(default)]
    results: Option<ListenResults>,
}

#[derive(Debug, Default, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<ListenChannel>,
}

#[derive(Debug, Default, Deserialize)]
struct ListenChannel {
    #[serde(default)]
    alternatives: Vec<ListenAlternative>,
}

#[derive(Debug, Default, Deserialize)]
struct ListenAlternative {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    confidence: f64,
}

/// Extract the first alternative of the first channel
fn parse_listen_response(body: &str) -> std::result::Result<Transcription, EvaluationError> {
    let response: ListenResponse = serde_json::from_str(body).map_err(|e| {
        EvaluationError::TranscriptionFailed(format!("unreadable Deepgram response: {}", e))
    })?;

    let alternative = response
        .results
        .and_then(|r| r.channels.into_iter().next())
        .and_then(|c| c.alternatives.into_iter().next())
        .unwrap_or_default();

    let transcript = alternative.transcript.trim().to_string();
    if transcript.is_empty() {
        return Err(EvaluationError::TranscriptionFailed(
            "transcription returned empty transcript".to_string(),
        ));
    }

    let confidence = if alternative.confidence.is_finite() {
        alternative.confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };

    Ok(Transcription {
        transcript,
        confidence,
    })
}

/// Deepgram API client
pub struct DeepgramClient {
    http_client: reqwest::Client,
    settings: DeepgramSettings,
}

impl DeepgramClient {
    pub fn new(settings: DeepgramSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build Deepgram HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            settings,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl Transcriber for DeepgramClient {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        mime_type: &str,
    ) -> std::result::Result<Transcription, EvaluationError> {
        let mime_type = if mime_type.trim().is_empty() {
            DEFAULT_AUDIO_MIME
        } else {
            mime_type
        };

        tracing::debug!(
            bytes = audio.len(),
            mime_type,
            model = %self.settings.transcription_model,
            "Requesting Deepgram transcription"
        );

        let response = self
            .http_client
            .post(self.endpoint("listen"))
            .query(&[
                ("model", self.settings.transcription_model.as_str()),
                ("smart_format", "true"),
            ])
            .header("Authorization", format!("Token {}", self.settings.api_key))
            .header("Content-Type", mime_type)
            .body(audio)
            .send()
            .await
            .map_err(|e| EvaluationError::TranscriptionFailed(format!("network error: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EvaluationError::TranscriptionFailed(format!("network error: {}", e)))?;

        if !status.is_success() {
            return Err(EvaluationError::TranscriptionFailed(format!(
                "Deepgram request failed: {} {}",
                status.as_u16(),
                body
            )));
        }

        let transcription = parse_listen_response(&body)?;
        tracing::debug!(
            confidence = transcription.confidence,
            chars = transcription.transcript.len(),
            "Deepgram transcription received"
        );
        Ok(transcription)
    }
}

#[async_trait]
impl SpeechSynthesizer for DeepgramClient {
    async fn synthesize(&self, text: &str) -> std::result::Result<Vec<u8>, EvaluationError> {
        let response = self
            .http_client
            .post(self.endpoint("speak"))
            .query(&[("model", self.settings.tts_model.as_str())])
            .header("Authorization", format!("Token {}", self.settings.api_key))
            .header("Accept", "audio/mpeg")
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| EvaluationError::SynthesisFailed(format!("network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EvaluationError::SynthesisFailed(format!(
                "Deepgram TTS request failed: {} {}",
                status.as_u16(),
                body
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| EvaluationError::SynthesisFailed(format!("network error: {}", e)))?;

        Ok(audio.to_vec())
    }
}
