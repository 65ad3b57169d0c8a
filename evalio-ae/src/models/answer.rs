//! Evaluated answer (immutable once persisted)

use chrono::{DateTime, Utc};
use evalio_common::AnswerScores;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Speech-flow indicators derived from the transcript and duration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechMetrics {
    pub word_count: u32,
    pub filler_word_count: u32,
    pub pause_count: u32,
    /// Rounded to 2 decimals
    pub words_per_minute: f64,
    /// Rounded to 3 decimals; 1.0 when the transcript has no words
    pub disfluency_ratio: f64,
}

/// Provider timing telemetry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiMeta {
    pub transcription_ms: u64,
    pub evaluation_ms: u64,
}

/// Stored recording backing an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFileRef {
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size: u64,
    pub storage_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub answer_id: Uuid,
    pub question_id: String,
    pub duration_sec: f64,
    pub transcript: String,
    pub audio_file: AudioFileRef,
    pub speech_metrics: SpeechMetrics,
    pub scores: AnswerScores,
    pub strong_points: Vec<String>,
    pub weak_points: Vec<String>,
    pub feedback: String,
    pub ai_meta: AiMeta,
    pub evaluated_at: DateTime<Utc>,
}

/// Result of one submission attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// This request computed and persisted the answer
    Evaluated(Answer),
    /// An answer already existed; it is returned unchanged
    AlreadyEvaluated(Answer),
    /// Another request holds the lock; the client should resubmit later
    Processing,
}

impl SubmissionOutcome {
    /// Wire name of the outcome
    pub fn status(&self) -> &'static str {
        match self {
            SubmissionOutcome::Evaluated(_) => "evaluated",
            SubmissionOutcome::AlreadyEvaluated(_) => "already_evaluated",
            SubmissionOutcome::Processing => "processing",
        }
    }

    pub fn answer(&self) -> Option<&Answer> {
        match self {
            SubmissionOutcome::Evaluated(answer) | SubmissionOutcome::AlreadyEvaluated(answer) => {
                Some(answer)
            }
            SubmissionOutcome::Processing => None,
        }
    }
}
