//! Answer score weighting
//!
//! The weighting here is the only definition of an overall score. Answer
//! evaluation derives per-answer scores with it, and session summaries
//! aggregate stored scores through it, so displayed numbers agree.

use serde::{Deserialize, Serialize};

/// Weight of the relevance sub-score
pub const RELEVANCE_WEIGHT: f64 = 0.35;
/// Weight of the technical depth sub-score
pub const TECHNICAL_DEPTH_WEIGHT: f64 = 0.30;
/// Weight of the clarity sub-score
pub const CLARITY_WEIGHT: f64 = 0.20;
/// Weight of the fluency score
pub const FLUENCY_WEIGHT: f64 = 0.10;
/// Weight of the speech-flow score
pub const SPEECH_FLOW_WEIGHT: f64 = 0.05;

/// Upper bound of every score
pub const MAX_SCORE: u8 = 100;

/// Round and clamp an arbitrary number into the `[0, 100]` score range
///
/// Non-finite input maps to 0.
pub fn clamp_score(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, MAX_SCORE as f64) as u8
}

/// The five weighted inputs of an overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubScores {
    pub relevance: u8,
    pub technical_depth: u8,
    pub clarity: u8,
    pub fluency: u8,
    pub speech_flow_score: u8,
}

/// Weighted overall score for one set of sub-scores
pub fn overall_score(sub: &SubScores) -> u8 {
    clamp_score(
        RELEVANCE_WEIGHT * sub.relevance as f64
            + TECHNICAL_DEPTH_WEIGHT * sub.technical_depth as f64
            + CLARITY_WEIGHT * sub.clarity as f64
            + FLUENCY_WEIGHT * sub.fluency as f64
            + SPEECH_FLOW_WEIGHT * sub.speech_flow_score as f64,
    )
}

/// Persisted scores of one answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerScores {
    pub relevance: u8,
    pub technical_depth: u8,
    pub clarity: u8,
    pub fluency: u8,
    pub speech_flow_score: u8,
    pub overall: u8,
}

impl AnswerScores {
    /// Build answer scores, deriving `overall` from the sub-scores
    pub fn from_sub_scores(sub: SubScores) -> Self {
        Self {
            relevance: sub.relevance,
            technical_depth: sub.technical_depth,
            clarity: sub.clarity,
            fluency: sub.fluency,
            speech_flow_score: sub.speech_flow_score,
            overall: overall_score(&sub),
        }
    }

    pub fn sub_scores(&self) -> SubScores {
        SubScores {
            relevance: self.relevance,
            technical_depth: self.technical_depth,
            clarity: self.clarity,
            fluency: self.fluency,
            speech_flow_score: self.speech_flow_score,
        }
    }
}

/// Per-field rounded mean of the sub-scores, `None` for no answers
pub fn average_sub_scores(scores: &[AnswerScores]) -> Option<SubScores> {
    if scores.is_empty() {
        return None;
    }

    let count = scores.len() as f64;
    let mean = |field: fn(&AnswerScores) -> u8| {
        clamp_score(scores.iter().map(|s| field(s) as f64).sum::<f64>() / count)
    };

    Some(SubScores {
        relevance: mean(|s| s.relevance),
        technical_depth: mean(|s| s.technical_depth),
        clarity: mean(|s| s.clarity),
        fluency: mean(|s| s.fluency),
        speech_flow_score: mean(|s| s.speech_flow_score),
    })
}

/// Session score shown on summaries: rounded mean of stored overall scores
///
/// Returns 0 for a session without answers.
pub fn session_overall_score(scores: &[AnswerScores]) -> u8 {
    if scores.is_empty() {
        return 0;
    }
    let total: f64 = scores.iter().map(|s| s.overall as f64).sum();
    clamp_score(total / scores.len() as f64)
}
