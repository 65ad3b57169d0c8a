//! evalio-ae - Answer Evaluator Microservice
//!
//! **Module Identity:**
//! - Name: evalio-ae (Answer Evaluator)
//! - Port: 5731 (default)
//!
//! Receives recorded interview answers, transcribes and scores them, and
//! stores exactly one evaluation per session question.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use evalio_ae::config::{CliArgs, EvaluatorConfig, TomlConfig, MODULE_NAME};
use evalio_common::config::load_toml_config;
use evalio_ae::services::{DeepgramClient, EvaluationOrchestrator, OpenRouterClient};
use evalio_ae::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // The TOML file is read before the subscriber exists so its logging level
    // can seed the filter
    let toml_config: TomlConfig = load_toml_config(MODULE_NAME, args.config.as_deref())
        .context("Failed to read configuration file")?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{},tower_http=info", toml_config.logging.level))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting evalio-ae (Answer Evaluator) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
    );

    let config = EvaluatorConfig::from_sources(&args, toml_config)
        .context("Failed to resolve configuration")?;

    // Step 1: Root folder and upload directory
    info!("Root folder: {}", config.root_folder.path().display());
    config
        .root_folder
        .ensure_directories()
        .context("Failed to initialize root folder")?;

    // Step 2: Database
    let db_path = config.root_folder.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = evalio_ae::db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;
    info!("Database connection established");

    // Step 3: Providers
    let deepgram = Arc::new(
        DeepgramClient::new(config.deepgram.clone()).context("Failed to create Deepgram client")?,
    );
    let openrouter = Arc::new(
        OpenRouterClient::new(config.openrouter.clone())
            .context("Failed to create OpenRouter client")?,
    );
    info!(
        transcription_model = %config.deepgram.transcription_model,
        tts_model = %config.deepgram.tts_model,
        evaluation_model = %config.openrouter.model,
        "Providers configured"
    );
    info!(
        lock_stale_after_ms = config.pipeline.lock_stale_after.as_millis() as u64,
        transcription_timeout_ms = config.pipeline.transcription_timeout.as_millis() as u64,
        evaluation_timeout_ms = config.pipeline.evaluation_timeout.as_millis() as u64,
        tts_timeout_ms = config.tts_timeout.as_millis() as u64,
        "Pipeline settings"
    );

    let orchestrator = Arc::new(EvaluationOrchestrator::new(
        db_pool.clone(),
        deepgram.clone(),
        openrouter,
        config.pipeline.clone(),
    ));

    let state = AppState::new(
        db_pool,
        orchestrator,
        deepgram,
        config.root_folder.answer_uploads_dir(),
    )
    .with_limits(&config);

    let app = evalio_ae::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr))?;
    info!("Listening on http://{}", config.listen_addr);
    info!("Health check: http://{}/health", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
