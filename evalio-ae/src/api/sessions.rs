//! Session summary endpoint

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use evalio_common::scoring::{average_sub_scores, session_overall_score};
use evalio_common::{AnswerScores, SubScores};
use serde::Serialize;
use uuid::Uuid;

use super::caller::CallerId;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{Difficulty, InterviewSession, InterviewType, Question, SessionStatus};
use crate::AppState;

/// GET /api/interview/:session_id response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub interview_type: InterviewType,
    pub difficulty: Difficulty,
    pub status: SessionStatus,
    pub questions: Vec<Question>,
    pub total_questions: usize,
    pub answered_count: usize,
    pub answered_question_ids: Vec<String>,
    pub overall_score: u8,
    /// Per-field mean of the answered sub-scores, null until an answer exists
    pub average_scores: Option<SubScores>,
    pub created_at: DateTime<Utc>,
}

impl From<InterviewSession> for SessionSummary {
    fn from(session: InterviewSession) -> Self {
        let scores: Vec<AnswerScores> = session.answers.iter().map(|a| a.scores).collect();
        Self {
            session_id: session.session_id,
            interview_type: session.interview_type,
            difficulty: session.difficulty,
            status: session.status(),
            total_questions: session.questions.len(),
            answered_count: session.answers.len(),
            answered_question_ids: session.answered_question_ids(),
            overall_score: session_overall_score(&scores),
            average_scores: average_sub_scores(&scores),
            created_at: session.created_at,
            questions: session.questions,
        }
    }
}

/// Parse a path session id
pub(crate) fn parse_session_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest("Invalid session id".to_string()))
}

/// Load a session the caller owns
pub(crate) async fn load_owned_session(
    state: &AppState,
    session_id: Uuid,
    user_id: &str,
) -> ApiResult<InterviewSession> {
    let session = db::sessions::load_session(&state.db, session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Interview session not found".to_string()))?;

    if !session.is_owned_by(user_id) {
        return Err(ApiError::Forbidden(
            "Not authorized to access this session".to_string(),
        ));
    }

    Ok(session)
}

/// GET /api/interview/:session_id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    CallerId(user_id): CallerId,
) -> ApiResult<Json<SessionSummary>> {
    let session_id = parse_session_id(&session_id)?;
    let session = load_owned_session(&state, session_id, &user_id).await?;
    Ok(Json(SessionSummary::from(session)))
}

/// Build session read routes
pub fn session_routes() -> Router<AppState> {
    Router::new().route("/api/interview/:session_id", get(get_session))
}
