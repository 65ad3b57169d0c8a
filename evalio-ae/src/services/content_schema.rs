//! Strict schema boundary for content evaluation output
//!
//! The evaluator is a language model returning free-form text. Its output is
//! either turned into a fully validated `ContentEvaluation` or rejected as a
//! whole with `EvaluationParseError`; partially valid responses are never
//! used.

use serde::Deserialize;

use super::providers::ContentEvaluation;
use super::EvaluationError;

/// Maximum strong/weak points kept
pub const MAX_POINTS: usize = 5;

/// Schema shown to the model in the system prompt
pub const RESPONSE_SCHEMA: &str = r#"{"relevance":0,"technicalDepth":0,"clarity":0,"strongPoints":[""],"weakPoints":[""],"feedback":""}"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvaluation {
    relevance: f64,
    technical_depth: f64,
    clarity: f64,
    strong_points: Vec<String>,
    weak_points: Vec<String>,
    feedback: String,
}

fn score(field: &str, value: f64) -> Result<u8, EvaluationError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(EvaluationError::EvaluationParseError(format!(
            "{} must be a number from 0 to 100, got {}",
            field, value
        )));
    }
    Ok(value.round() as u8)
}

fn points(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .take(MAX_POINTS)
        .collect()
}

/// Validate the model's message content
pub fn parse_content_evaluation(content: &str) -> Result<ContentEvaluation, EvaluationError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(EvaluationError::EvaluationParseError(
            "evaluation provider returned empty content".to_string(),
        ));
    }

    let raw: RawEvaluation = serde_json::from_str(content).map_err(|e| {
        EvaluationError::EvaluationParseError(format!("response does not match schema: {}", e))
    })?;

    Ok(ContentEvaluation {
        relevance: score("relevance", raw.relevance)?,
        technical_depth: score("technicalDepth", raw.technical_depth)?,
        clarity: score("clarity", raw.clarity)?,
        strong_points: points(raw.strong_points),
        weak_points: points(raw.weak_points),
        feedback: raw.feedback.trim().to_string(),
    })
}
