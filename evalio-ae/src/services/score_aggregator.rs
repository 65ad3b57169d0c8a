//! Combines content sub-scores with delivery scores
//!
//! The weighting itself lives in `evalio_common::scoring` so summaries and
//! reports recompute overall scores the same way.

use evalio_common::{AnswerScores, SubScores};

use super::providers::ContentEvaluation;
use super::speech_metrics::SpeechAnalysis;

pub fn aggregate_scores(content: &ContentEvaluation, speech: &SpeechAnalysis) -> AnswerScores {
    AnswerScores::from_sub_scores(SubScores {
        relevance: content.relevance,
        technical_depth: content.technical_depth,
        clarity: content.clarity,
        fluency: speech.fluency_score,
        speech_flow_score: speech.speech_flow_score,
    })
}
