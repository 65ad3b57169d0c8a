//! Test Helper Utilities
//!
//! Shared fixtures for evalio-ae integration tests: a file-backed database,
//! seeded sessions, uploads on disk and scripted providers.

#![allow(dead_code)]

pub mod fake_providers;

pub use fake_providers::{EvaluatorBehavior, FakeEvaluator, FakeSynthesizer, FakeTranscriber};

use evalio_ae::models::{Difficulty, InterviewSession, InterviewType, Question};
use evalio_ae::services::{
    AnswerSubmission, EvaluationOrchestrator, PipelineSettings, UploadedAudio,
};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const OWNER: &str = "user-owner";
pub const OTHER_USER: &str = "user-other";

/// 30 s of webm at the nominal 48 kbps
pub const ANSWER_DURATION_SEC: f64 = 30.0;
pub const ANSWER_BYTES: usize = 180_000;

/// Create a temporary file-backed database with tables
///
/// A file is used rather than `:memory:` so several pool connections see the
/// same data. TempDir must be kept alive for the duration of the test.
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let pool = evalio_ae::db::init_database_pool(&temp_dir.path().join("evalio.db"))
        .await
        .expect("Failed to create test database");
    (temp_dir, pool)
}

/// Insert a two-question technical session owned by `user_id`
pub async fn seed_session(pool: &SqlitePool, user_id: &str) -> InterviewSession {
    let session = InterviewSession::new(
        user_id,
        InterviewType::Technical,
        Difficulty::Medium,
        vec![
            Question {
                id: "q1".to_string(),
                text: "Describe a cache you designed and how you invalidated it.".to_string(),
                category: InterviewType::Technical,
            },
            Question {
                id: "q2".to_string(),
                text: "How do you debug a memory leak in production?".to_string(),
                category: InterviewType::Technical,
            },
        ],
    );
    evalio_ae::db::sessions::insert_session(pool, &session)
        .await
        .expect("Failed to insert session");
    session
}

/// Write a fake recording into `dir`
pub fn write_upload(dir: &Path, name: &str) -> UploadedAudio {
    let path = dir.join(name);
    std::fs::write(&path, vec![0x1a_u8; ANSWER_BYTES]).expect("Failed to write upload");
    UploadedAudio {
        original_name: "answer.webm".to_string(),
        stored_name: name.to_string(),
        mime_type: "audio/webm".to_string(),
        size: ANSWER_BYTES as u64,
        path,
    }
}

pub fn submission(
    session: &InterviewSession,
    user_id: &str,
    question_id: &str,
    audio: UploadedAudio,
) -> AnswerSubmission {
    AnswerSubmission {
        user_id: user_id.to_string(),
        session_id: session.session_id,
        question_id: question_id.to_string(),
        duration_sec: ANSWER_DURATION_SEC,
        audio,
    }
}

/// Orchestrator wired to scripted providers, plus handles to inspect them
pub struct TestPipeline {
    pub temp_dir: TempDir,
    pub pool: SqlitePool,
    pub uploads_dir: PathBuf,
    pub transcriber: Arc<FakeTranscriber>,
    pub evaluator: Arc<FakeEvaluator>,
    pub orchestrator: Arc<EvaluationOrchestrator>,
}

impl TestPipeline {
    pub async fn new(
        transcriber: FakeTranscriber,
        evaluator: FakeEvaluator,
        settings: PipelineSettings,
    ) -> Self {
        let (temp_dir, pool) = create_test_db().await;
        let uploads_dir = temp_dir.path().join("uploads");
        std::fs::create_dir_all(&uploads_dir).expect("Failed to create uploads dir");

        let transcriber = Arc::new(transcriber);
        let evaluator = Arc::new(evaluator);
        let orchestrator = Arc::new(EvaluationOrchestrator::new(
            pool.clone(),
            transcriber.clone(),
            evaluator.clone(),
            settings,
        ));

        Self {
            temp_dir,
            pool,
            uploads_dir,
            transcriber,
            evaluator,
            orchestrator,
        }
    }

    /// Default providers and settings
    pub async fn standard() -> Self {
        Self::new(
            FakeTranscriber::fluent(),
            FakeEvaluator::new(EvaluatorBehavior::Succeed),
            PipelineSettings::default(),
        )
        .await
    }

    pub fn upload(&self, name: &str) -> UploadedAudio {
        write_upload(&self.uploads_dir, name)
    }

    /// Number of stored answers for a session question
    pub async fn answer_rows(&self, session: &InterviewSession, question_id: &str) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM answers WHERE session_id = ? AND question_id = ?",
        )
        .bind(session.session_id.to_string())
        .bind(question_id)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to count answers")
    }
}
