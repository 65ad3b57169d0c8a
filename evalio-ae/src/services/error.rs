//! Evaluation pipeline errors

use thiserror::Error;

/// Failures of one answer submission
///
/// Lock contention and duplicate submissions are not errors; they are
/// reported through `SubmissionOutcome`.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// Declared duration or file size is implausible
    #[error("Invalid audio metadata: {0}")]
    InvalidAudioMetadata(String),

    /// Upload is not a recognised audio format
    #[error("Unsupported audio format: {0}")]
    UnsupportedAudio(String),

    /// Transcript too short or transcription confidence too low
    #[error("Audio quality is too low to evaluate. Please re-record your answer clearly.")]
    LowAudioQuality { word_count: u32, confidence: f64 },

    /// Transcription provider failed or returned an empty transcript
    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    /// Content evaluation provider rejected the request or was unreachable
    #[error("Content evaluation failed: {0}")]
    EvaluationFailed(String),

    /// Content evaluation response did not match the expected schema
    #[error("Content evaluation returned an invalid response: {0}")]
    EvaluationParseError(String),

    /// Speech synthesis provider failed
    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    /// A provider call exceeded its time budget and was cancelled
    #[error("{provider} timed out after {timeout_ms} ms")]
    ProviderTimeout {
        provider: &'static str,
        timeout_ms: u64,
    },

    #[error("Interview session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    #[error("Not authorized to access this session")]
    Forbidden,

    #[error("Invalid questionId for this session: {0}")]
    UnknownQuestion(String),

    #[error("Storage error: {0}")]
    Storage(#[from] evalio_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EvaluationError {
    /// True for failures caused by an external provider
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            EvaluationError::TranscriptionFailed(_)
                | EvaluationError::EvaluationFailed(_)
                | EvaluationError::EvaluationParseError(_)
                | EvaluationError::SynthesisFailed(_)
                | EvaluationError::ProviderTimeout { .. }
        )
    }
}
