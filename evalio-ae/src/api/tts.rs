//! Question audio endpoint
//!
//! POST /api/interview/:session_id/tts `{questionId, text}` → `audio/mpeg`
//!
//! Only the session's own question texts (or any greeting) are spoken, so the
//! endpoint cannot be used as a general text-to-speech proxy.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use super::caller::CallerId;
use super::sessions::{load_owned_session, parse_session_id};
use crate::error::{ApiError, ApiResult};
use crate::services::with_timeout;
use crate::AppState;

/// Question id reserved for the interviewer's greeting
pub const GREETING_QUESTION_ID: &str = "greeting";

const CACHE_CONTROL: &str = "private, max-age=300";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsRequest {
    #[serde(default)]
    pub question_id: String,
    #[serde(default)]
    pub text: String,
}

/// POST /api/interview/:session_id/tts
pub async fn synthesize_question(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    CallerId(user_id): CallerId,
    Json(request): Json<TtsRequest>,
) -> ApiResult<Response> {
    let session_id = parse_session_id(&session_id)?;

    let question_id = request.question_id.trim();
    if question_id.is_empty() {
        return Err(ApiError::BadRequest("questionId is required".to_string()));
    }
    let text = request.text.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Question text is required".to_string()));
    }

    let session = load_owned_session(&state, session_id, &user_id).await?;

    let canonical = if question_id == GREETING_QUESTION_ID {
        text.to_string()
    } else {
        let question = session.question(question_id).ok_or_else(|| {
            ApiError::BadRequest("Invalid questionId for this session".to_string())
        })?;
        let canonical = question.text.trim();
        if canonical.is_empty() {
            return Err(ApiError::BadRequest(
                "Question text is not available".to_string(),
            ));
        }
        if text != canonical {
            return Err(ApiError::BadRequest(
                "Question text does not match session question".to_string(),
            ));
        }
        canonical.to_string()
    };

    let audio = with_timeout(
        "TTS provider",
        state.tts_timeout,
        state.synthesizer.synthesize(&canonical),
    )
    .await
    .map_err(|e| {
        tracing::error!(
            user_id = %user_id,
            session_id = %session_id,
            question_id,
            error = %e,
            "Question TTS failed"
        );
        ApiError::BadGateway("Question audio generation failed".to_string())
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "audio/mpeg"),
            (header::CACHE_CONTROL, CACHE_CONTROL),
        ],
        audio,
    )
        .into_response())
}

/// Build question audio routes
pub fn tts_routes() -> Router<AppState> {
    Router::new().route("/api/interview/:session_id/tts", post(synthesize_question))
}
