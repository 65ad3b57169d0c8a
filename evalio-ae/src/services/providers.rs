//! External provider seams
//!
//! Transcription, content evaluation and speech synthesis are remote calls
//! taking seconds each. The pipeline only sees these traits; production
//! implementations live in `deepgram_client` and `openrouter_client`.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use super::EvaluationError;
use crate::models::{Difficulty, InterviewType};

/// Speech-to-text result
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub transcript: String,
    /// Provider confidence in `[0, 1]`
    pub confidence: f64,
}

/// Input of one content evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct ContentEvaluationRequest {
    pub question: String,
    pub transcript: String,
    pub interview_type: InterviewType,
    pub difficulty: Difficulty,
}

/// Validated content evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEvaluation {
    pub relevance: u8,
    pub technical_depth: u8,
    pub clarity: u8,
    /// At most 5 entries, none blank
    pub strong_points: Vec<String>,
    /// At most 5 entries, none blank
    pub weak_points: Vec<String>,
    pub feedback: String,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one audio blob
    ///
    /// An empty transcript is reported as `TranscriptionFailed`.
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        mime_type: &str,
    ) -> Result<Transcription, EvaluationError>;
}

#[async_trait]
pub trait ContentEvaluator: Send + Sync {
    /// Score an answer's content; single attempt, no retry
    async fn evaluate(
        &self,
        request: &ContentEvaluationRequest,
    ) -> Result<ContentEvaluation, EvaluationError>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render text as `audio/mpeg`
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, EvaluationError>;
}

/// Run a provider call under a deadline
///
/// On expiry the in-flight future is dropped, which aborts its HTTP request.
pub async fn with_timeout<T, F>(
    provider: &'static str,
    timeout: Duration,
    call: F,
) -> Result<T, EvaluationError>
where
    F: Future<Output = Result<T, EvaluationError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                provider,
                timeout_ms = timeout.as_millis() as u64,
                "Provider call timed out"
            );
            Err(EvaluationError::ProviderTimeout {
                provider,
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}
