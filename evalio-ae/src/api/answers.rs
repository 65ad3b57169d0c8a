//! Answer submission endpoint
//!
//! POST /api/interview/:session_id/answers (multipart: `audio`, `questionId`,
//! `durationSec`)
//!
//! - 201 `evaluated`: this request computed and stored the answer
//! - 200 `already_evaluated`: the stored answer, unchanged
//! - 202 `processing`: another request holds the question lock
//! - 400/403/404/502 as mapped from `EvaluationError`

use axum::{
    extract::{
        multipart::{Field, MultipartError},
        Multipart, Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use evalio_common::AnswerScores;
use serde::Serialize;
use std::path::Path as FsPath;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::caller::CallerId;
use super::sessions::parse_session_id;
use crate::error::{ApiError, ApiResult};
use crate::models::{AiMeta, Answer, SpeechMetrics, SubmissionOutcome};
use crate::services::{AnswerSubmission, EvaluationError, UploadedAudio};
use crate::utils::{discard_upload, is_supported_audio, stored_file_name};
use crate::AppState;

const PROCESSING_MESSAGE: &str = "Answer is being processed. Retry in a few seconds.";

/// Answer as returned to the client (storage location omitted)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub status: &'static str,
    pub question_id: String,
    pub answer_id: Uuid,
    pub transcript: String,
    pub duration_sec: f64,
    pub scores: AnswerScores,
    pub strong_points: Vec<String>,
    pub weak_points: Vec<String>,
    pub feedback: String,
    pub speech_metrics: SpeechMetrics,
    pub ai_meta: AiMeta,
    pub evaluated_at: DateTime<Utc>,
}

impl AnswerResponse {
    fn new(status: &'static str, answer: Answer) -> Self {
        Self {
            status,
            question_id: answer.question_id,
            answer_id: answer.answer_id,
            transcript: answer.transcript,
            duration_sec: answer.duration_sec,
            scores: answer.scores,
            strong_points: answer.strong_points,
            weak_points: answer.weak_points,
            feedback: answer.feedback,
            speech_metrics: answer.speech_metrics,
            ai_meta: answer.ai_meta,
            evaluated_at: answer.evaluated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProcessingResponse {
    status: &'static str,
    message: &'static str,
}

impl IntoResponse for SubmissionOutcome {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            SubmissionOutcome::Evaluated(answer) => {
                (StatusCode::CREATED, Json(AnswerResponse::new(status, answer))).into_response()
            }
            SubmissionOutcome::AlreadyEvaluated(answer) => {
                (StatusCode::OK, Json(AnswerResponse::new(status, answer))).into_response()
            }
            SubmissionOutcome::Processing => (
                StatusCode::ACCEPTED,
                Json(ProcessingResponse {
                    status,
                    message: PROCESSING_MESSAGE,
                }),
            )
                .into_response(),
        }
    }
}

/// Multipart fields collected so far
#[derive(Debug, Default)]
struct AnswerForm {
    question_id: Option<String>,
    duration_sec: Option<String>,
    audio: Option<UploadedAudio>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Stream the `audio` field into the uploads directory
///
/// A partially written file is removed before returning an error.
async fn store_audio(mut field: Field<'_>, uploads_dir: &FsPath) -> ApiResult<UploadedAudio> {
    let original_name = field
        .file_name()
        .map(str::to_string)
        .unwrap_or_else(|| "answer.webm".to_string());
    let mime_type = field.content_type().map(str::to_string).unwrap_or_default();

    if !is_supported_audio(&original_name, &mime_type) {
        return Err(EvaluationError::UnsupportedAudio(
            "only webm, wav, mp3, m4a and aac recordings are accepted".to_string(),
        )
        .into());
    }

    let stored_name = stored_file_name(&original_name);
    let path = uploads_dir.join(&stored_name);
    let mut file = tokio::fs::File::create(&path).await?;
    let mut size: u64 = 0;

    let written: ApiResult<()> = async {
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            size += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
    .await;

    if let Err(e) = written {
        drop(file);
        discard_upload(&path).await;
        return Err(e);
    }

    tracing::debug!(
        stored_name = %stored_name,
        size,
        mime_type = %mime_type,
        "Answer audio stored"
    );

    Ok(UploadedAudio {
        original_name,
        stored_name,
        mime_type,
        size,
        path,
    })
}

async fn read_form(
    multipart: &mut Multipart,
    uploads_dir: &FsPath,
    form: &mut AnswerForm,
) -> ApiResult<()> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("questionId") => {
                form.question_id = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("durationSec") => {
                form.duration_sec = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("audio") => {
                if form.audio.is_some() {
                    return Err(ApiError::BadRequest(
                        "Only one audio file may be submitted".to_string(),
                    ));
                }
                form.audio = Some(store_audio(field, uploads_dir).await?);
            }
            _ => {}
        }
    }
    Ok(())
}

/// POST /api/interview/:session_id/answers
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    CallerId(user_id): CallerId,
    mut multipart: Multipart,
) -> ApiResult<SubmissionOutcome> {
    let session_id = parse_session_id(&session_id)?;

    let mut form = AnswerForm::default();
    if let Err(e) = read_form(&mut multipart, &state.uploads_dir, &mut form).await {
        if let Some(audio) = &form.audio {
            discard_upload(&audio.path).await;
        }
        return Err(e);
    }

    let question_id = form
        .question_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let (question_id, audio) = match (question_id, form.audio) {
        (Some(question_id), Some(audio)) => (question_id, audio),
        (None, audio) => {
            if let Some(audio) = audio {
                discard_upload(&audio.path).await;
            }
            return Err(ApiError::BadRequest("questionId is required".to_string()));
        }
        (Some(_), None) => {
            return Err(ApiError::BadRequest("Audio file is required".to_string()));
        }
    };

    // Unparsable durations are rejected by audio validation
    let duration_sec = form
        .duration_sec
        .as_deref()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN);

    let outcome = state
        .orchestrator
        .submit_answer(AnswerSubmission {
            user_id,
            session_id,
            question_id,
            duration_sec,
            audio,
        })
        .await?;

    Ok(outcome)
}

/// Build answer submission routes
pub fn answer_routes() -> Router<AppState> {
    Router::new().route("/api/interview/:session_id/answers", post(submit_answer))
}
