//! evalio-ae library interface
//!
//! Answer Evaluator: turns a recorded interview answer into exactly one
//! stored evaluation per question, however often the submission is retried.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::config::EvaluatorConfig;
use crate::services::{EvaluationOrchestrator, SpeechSynthesizer};

/// Multipart framing allowance on top of the audio limit
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub orchestrator: Arc<EvaluationOrchestrator>,
    /// Question audio provider
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Directory receiving answer uploads
    pub uploads_dir: PathBuf,
    pub tts_timeout: Duration,
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        orchestrator: Arc<EvaluationOrchestrator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        uploads_dir: PathBuf,
    ) -> Self {
        Self {
            db,
            orchestrator,
            synthesizer,
            uploads_dir,
            tts_timeout: Duration::from_millis(config::DEFAULT_TTS_TIMEOUT_MS),
            max_upload_bytes: config::DEFAULT_MAX_UPLOAD_BYTES,
            startup_time: Utc::now(),
        }
    }

    /// Apply the HTTP-level limits from the resolved configuration
    pub fn with_limits(mut self, config: &EvaluatorConfig) -> Self {
        self.tts_timeout = config.tts_timeout;
        self.max_upload_bytes = config.max_upload_bytes;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .merge(api::answer_routes())
        .merge(api::session_routes())
        .merge(api::tts_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
