//! Answer evaluation pipeline
//!
//! validate audio → acquire lock → transcribe → speech metrics → quality gate
//! → content evaluation → aggregate → persist (clears lock)
//!
//! Every failure after lock acquisition releases the lock, so the question
//! returns to its pre-submission state and the client may resubmit. Provider
//! calls are attempted once per submission.

use chrono::Utc;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::audio_validator::{validate_audio, MAX_DURATION_SEC};
use super::providers::{with_timeout, ContentEvaluationRequest, ContentEvaluator, Transcriber};
use super::score_aggregator::aggregate_scores;
use super::speech_metrics::{analyze_speech, passes_quality_gate};
use super::EvaluationError;
use crate::db::{self, LockAcquisition, PersistOutcome};
use crate::models::{AiMeta, Answer, AudioFileRef, InterviewSession, Question, SubmissionOutcome};
use crate::utils::discard_upload;

/// Tunables of the pipeline, resolved once at startup
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Age after which another request may reclaim a lock
    pub lock_stale_after: Duration,
    pub transcription_timeout: Duration,
    pub evaluation_timeout: Duration,
    /// Storage-level retry budget for `database is locked`
    pub db_max_lock_wait_ms: u64,
    pub max_duration_sec: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            lock_stale_after: Duration::from_secs(120),
            transcription_timeout: Duration::from_secs(20),
            evaluation_timeout: Duration::from_secs(25),
            db_max_lock_wait_ms: 5000,
            max_duration_sec: MAX_DURATION_SEC,
        }
    }
}

/// Recording already written to the uploads directory
#[derive(Debug, Clone)]
pub struct UploadedAudio {
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size: u64,
    pub path: PathBuf,
}

impl UploadedAudio {
    fn file_ref(&self) -> AudioFileRef {
        AudioFileRef {
            original_name: self.original_name.clone(),
            stored_name: self.stored_name.clone(),
            mime_type: self.mime_type.clone(),
            size: self.size,
            storage_path: self.path.display().to_string(),
        }
    }
}

/// One answer submission
#[derive(Debug, Clone)]
pub struct AnswerSubmission {
    /// Authenticated caller
    pub user_id: String,
    pub session_id: Uuid,
    pub question_id: String,
    pub duration_sec: f64,
    pub audio: UploadedAudio,
}

/// Composes validation, locking, providers and persistence
pub struct EvaluationOrchestrator {
    db: SqlitePool,
    transcriber: Arc<dyn Transcriber>,
    evaluator: Arc<dyn ContentEvaluator>,
    settings: PipelineSettings,
}

impl EvaluationOrchestrator {
    pub fn new(
        db: SqlitePool,
        transcriber: Arc<dyn Transcriber>,
        evaluator: Arc<dyn ContentEvaluator>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            db,
            transcriber,
            evaluator,
            settings,
        }
    }

    /// Evaluate one submission
    ///
    /// The uploaded file is kept only when this request persisted a new
    /// answer; every other outcome deletes it. If the returned future is
    /// dropped before completion, a background task releases this request's
    /// lock and deletes the upload.
    pub async fn submit_answer(
        &self,
        submission: AnswerSubmission,
    ) -> Result<SubmissionOutcome, EvaluationError> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        let mut guard = AbandonGuard {
            db: self.db.clone(),
            upload: submission.audio.path.clone(),
            lock: None,
            db_max_lock_wait_ms: self.settings.db_max_lock_wait_ms,
            armed: true,
        };
        let result = self.run(&submission, request_id, &mut guard).await;
        guard.armed = false;

        if !matches!(result, Ok(SubmissionOutcome::Evaluated(_))) {
            discard_upload(&submission.audio.path).await;
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(outcome) => tracing::info!(
                session_id = %submission.session_id,
                question_id = %submission.question_id,
                request_id = %request_id,
                status = outcome.status(),
                elapsed_ms,
                "Answer submission finished"
            ),
            Err(e) if e.is_upstream() => tracing::error!(
                session_id = %submission.session_id,
                question_id = %submission.question_id,
                request_id = %request_id,
                elapsed_ms,
                error = %e,
                "Answer evaluation failed upstream"
            ),
            Err(e) => tracing::warn!(
                session_id = %submission.session_id,
                question_id = %submission.question_id,
                request_id = %request_id,
                elapsed_ms,
                error = %e,
                "Answer submission rejected"
            ),
        }

        result
    }

    async fn run(
        &self,
        submission: &AnswerSubmission,
        request_id: Uuid,
        guard: &mut AbandonGuard,
    ) -> Result<SubmissionOutcome, EvaluationError> {
        validate_audio(
            submission.duration_sec,
            submission.audio.size,
            &submission.audio.mime_type,
            self.settings.max_duration_sec,
        )?;

        let session = db::sessions::load_session(&self.db, submission.session_id)
            .await?
            .ok_or(EvaluationError::SessionNotFound(submission.session_id))?;

        if !session.is_owned_by(&submission.user_id) {
            return Err(EvaluationError::Forbidden);
        }

        let question = session
            .question(&submission.question_id)
            .cloned()
            .ok_or_else(|| EvaluationError::UnknownQuestion(submission.question_id.clone()))?;

        if let Some(existing) = session.answer_for(&question.id) {
            return Ok(SubmissionOutcome::AlreadyEvaluated(existing.clone()));
        }

        let acquisition = db::locks::try_acquire_lock(
            &self.db,
            session.session_id,
            &question.id,
            request_id,
            Utc::now(),
            self.settings.lock_stale_after,
            self.settings.db_max_lock_wait_ms,
        )
        .await?;

        if acquisition == LockAcquisition::NotAcquired {
            // The holder may have finished between the session read and the attempt
            return match db::answers::find_answer(&self.db, session.session_id, &question.id)
                .await?
            {
                Some(existing) => Ok(SubmissionOutcome::AlreadyEvaluated(existing)),
                None => Ok(SubmissionOutcome::Processing),
            };
        }

        guard.lock = Some(HeldLock {
            session_id: session.session_id,
            question_id: question.id.clone(),
            request_id,
        });

        let result = self
            .evaluate_locked(&session, &question, submission, request_id)
            .await;

        if result.is_err() {
            if let Err(e) = db::locks::release_lock(
                &self.db,
                session.session_id,
                &question.id,
                request_id,
                self.settings.db_max_lock_wait_ms,
            )
            .await
            {
                // Left for stale reclamation
                tracing::error!(
                    session_id = %session.session_id,
                    question_id = %question.id,
                    request_id = %request_id,
                    error = %e,
                    "Failed to release processing lock"
                );
            }
        }

        result
    }

    async fn evaluate_locked(
        &self,
        session: &InterviewSession,
        question: &Question,
        submission: &AnswerSubmission,
        request_id: Uuid,
    ) -> Result<SubmissionOutcome, EvaluationError> {
        let audio = tokio::fs::read(&submission.audio.path).await?;

        let started = Instant::now();
        let transcription = with_timeout(
            "Transcription provider",
            self.settings.transcription_timeout,
            self.transcriber
                .transcribe(audio, &submission.audio.mime_type),
        )
        .await?;
        let transcription_ms = started.elapsed().as_millis() as u64;

        let transcript = transcription.transcript.trim().to_string();
        if transcript.is_empty() {
            return Err(EvaluationError::TranscriptionFailed(
                "transcription returned empty transcript".to_string(),
            ));
        }

        let speech = analyze_speech(&transcript, submission.duration_sec);
        if !passes_quality_gate(speech.metrics.word_count, transcription.confidence) {
            return Err(EvaluationError::LowAudioQuality {
                word_count: speech.metrics.word_count,
                confidence: transcription.confidence,
            });
        }

        let request = ContentEvaluationRequest {
            question: question.text.clone(),
            transcript: transcript.clone(),
            interview_type: session.interview_type,
            difficulty: session.difficulty,
        };

        let started = Instant::now();
        let content = with_timeout(
            "Evaluation provider",
            self.settings.evaluation_timeout,
            self.evaluator.evaluate(&request),
        )
        .await?;
        let evaluation_ms = started.elapsed().as_millis() as u64;

        let answer = Answer {
            answer_id: Uuid::new_v4(),
            question_id: question.id.clone(),
            duration_sec: submission.duration_sec,
            transcript,
            audio_file: submission.audio.file_ref(),
            speech_metrics: speech.metrics,
            scores: aggregate_scores(&content, &speech),
            strong_points: content.strong_points,
            weak_points: content.weak_points,
            feedback: content.feedback,
            ai_meta: AiMeta {
                transcription_ms,
                evaluation_ms,
            },
            evaluated_at: Utc::now(),
        };

        let outcome = db::answers::persist_answer(
            &self.db,
            session.session_id,
            request_id,
            &answer,
            self.settings.db_max_lock_wait_ms,
        )
        .await?;

        Ok(match outcome {
            PersistOutcome::Persisted(answer) => SubmissionOutcome::Evaluated(answer),
            PersistOutcome::Replayed(existing) => SubmissionOutcome::AlreadyEvaluated(existing),
            // A newer request reclaimed the lock and is still running
            PersistOutcome::LockLost => SubmissionOutcome::Processing,
        })
    }
}

#[derive(Debug, Clone)]
struct HeldLock {
    session_id: Uuid,
    question_id: String,
    request_id: Uuid,
}

/// Cleanup for a submission whose future is dropped mid-pipeline
///
/// Armed for the whole of `run`. Dropping it while armed spawns the release
/// of the held lock and the deletion of the upload. An upload already
/// referenced by a stored answer is kept.
struct AbandonGuard {
    db: SqlitePool,
    upload: PathBuf,
    lock: Option<HeldLock>,
    db_max_lock_wait_ms: u64,
    armed: bool,
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                path = %self.upload.display(),
                "Submission abandoned outside a runtime; lock left for stale reclamation"
            );
            return;
        };

        let db = self.db.clone();
        let upload = std::mem::take(&mut self.upload);
        let lock = self.lock.take();
        let max_wait_ms = self.db_max_lock_wait_ms;

        runtime.spawn(async move {
            if let Some(lock) = lock {
                tracing::warn!(
                    session_id = %lock.session_id,
                    question_id = %lock.question_id,
                    request_id = %lock.request_id,
                    "Answer submission abandoned; releasing processing lock"
                );
                if let Err(e) = db::locks::release_lock(
                    &db,
                    lock.session_id,
                    &lock.question_id,
                    lock.request_id,
                    max_wait_ms,
                )
                .await
                {
                    tracing::error!(
                        session_id = %lock.session_id,
                        question_id = %lock.question_id,
                        request_id = %lock.request_id,
                        error = %e,
                        "Failed to release abandoned processing lock"
                    );
                }

                // Dropped after the persist transaction committed
                let stored = db::answers::find_answer(&db, lock.session_id, &lock.question_id)
                    .await
                    .ok()
                    .flatten();
                let upload_path = upload.display().to_string();
                if stored.is_some_and(|answer| answer.audio_file.storage_path == upload_path) {
                    return;
                }
            }
            discard_upload(&upload).await;
        });
    }
}
