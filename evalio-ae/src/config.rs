//! Configuration resolution for evalio-ae
//!
//! Resolved once at startup into an immutable `EvaluatorConfig`; nothing in
//! the pipeline reads the process environment afterwards.
//!
//! Priority for every setting: command line → environment → TOML file
//! (`evalio-ae.toml`) → compiled default.

use clap::Parser;
use evalio_common::config::{resolve_root_folder, LoggingConfig, RootFolder, ROOT_FOLDER_ENV};
use evalio_common::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::services::audio_validator::MAX_DURATION_SEC;
use crate::services::PipelineSettings;

/// Module name, also the TOML file stem
pub const MODULE_NAME: &str = "evalio-ae";

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5731;
pub const DEFAULT_TTS_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 15 * 1024 * 1024;

pub const DEEPGRAM_API_KEY_ENV: &str = "DEEPGRAM_API_KEY";
pub const DEEPGRAM_TTS_MODEL_ENV: &str = "DEEPGRAM_TTS_MODEL";
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const OPENROUTER_MODEL_ENV: &str = "OPENROUTER_MODEL";

const DEFAULT_DEEPGRAM_BASE_URL: &str = "https://api.deepgram.com/v1";
const DEFAULT_TRANSCRIPTION_MODEL: &str = "nova-3";
const DEFAULT_TTS_MODEL: &str = "aura-2-thalia-en";
const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o-mini";

/// Command-line arguments for evalio-ae
#[derive(Parser, Debug, Default)]
#[command(name = "evalio-ae")]
#[command(about = "Answer Evaluator microservice for EVALIO")]
#[command(version)]
pub struct CliArgs {
    /// Explicit TOML config file
    #[arg(short, long, env = "EVALIO_AE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root folder holding the database and uploads
    #[arg(short, long)]
    pub root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long, env = "EVALIO_AE_BIND")]
    pub bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "EVALIO_AE_PORT")]
    pub port: Option<u16>,
}

/// `[pipeline]` section of the TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineToml {
    pub lock_stale_after_ms: Option<u64>,
    pub transcription_timeout_ms: Option<u64>,
    pub evaluation_timeout_ms: Option<u64>,
    pub tts_timeout_ms: Option<u64>,
    pub db_max_lock_wait_ms: Option<u64>,
    pub max_upload_bytes: Option<usize>,
    pub max_duration_sec: Option<f64>,
}

/// `[deepgram]` section of the TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeepgramToml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub transcription_model: Option<String>,
    pub tts_model: Option<String>,
}

/// `[openrouter]` section of the TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenRouterToml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

/// Contents of `evalio-ae.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    #[serde(default)]
    pub pipeline: PipelineToml,
    #[serde(default)]
    pub deepgram: DeepgramToml,
    #[serde(default)]
    pub openrouter: OpenRouterToml,
}

/// Deepgram listen/speak settings
#[derive(Debug, Clone)]
pub struct DeepgramSettings {
    pub api_key: String,
    pub base_url: String,
    pub transcription_model: String,
    pub tts_model: String,
}

/// OpenRouter chat-completions settings
#[derive(Debug, Clone)]
pub struct OpenRouterSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub root_folder: RootFolder,
    pub listen_addr: String,
    pub logging: LoggingConfig,
    pub pipeline: PipelineSettings,
    pub tts_timeout: Duration,
    pub max_upload_bytes: usize,
    pub deepgram: DeepgramSettings,
    pub openrouter: OpenRouterSettings,
}

impl EvaluatorConfig {
    /// Resolve against the loaded TOML config (see `load_toml_config`)
    pub fn from_sources(args: &CliArgs, toml_config: TomlConfig) -> Result<Self> {
        let root_folder = RootFolder::new(resolve_root_folder(
            args.root_folder.as_deref(),
            ROOT_FOLDER_ENV,
            toml_config.root_folder.as_deref(),
        ));

        let bind = args
            .bind
            .clone()
            .or(toml_config.bind_address.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);

        let pipeline_toml = &toml_config.pipeline;
        let defaults = PipelineSettings::default();
        let millis = |env_name: &str, toml_value: Option<u64>, default: Duration| {
            env_u64(env_name)
                .or(toml_value)
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        let pipeline = PipelineSettings {
            lock_stale_after: millis(
                "EVALIO_LOCK_STALE_AFTER_MS",
                pipeline_toml.lock_stale_after_ms,
                defaults.lock_stale_after,
            ),
            transcription_timeout: millis(
                "EVALIO_TRANSCRIPTION_TIMEOUT_MS",
                pipeline_toml.transcription_timeout_ms,
                defaults.transcription_timeout,
            ),
            evaluation_timeout: millis(
                "EVALIO_EVALUATION_TIMEOUT_MS",
                pipeline_toml.evaluation_timeout_ms,
                defaults.evaluation_timeout,
            ),
            db_max_lock_wait_ms: env_u64("EVALIO_DB_MAX_LOCK_WAIT_MS")
                .or(pipeline_toml.db_max_lock_wait_ms)
                .unwrap_or(defaults.db_max_lock_wait_ms),
            max_duration_sec: pipeline_toml
                .max_duration_sec
                .unwrap_or(defaults.max_duration_sec),
        };

        if !(pipeline.max_duration_sec.is_finite()
            && pipeline.max_duration_sec > 0.0
            && pipeline.max_duration_sec <= MAX_DURATION_SEC)
        {
            return Err(Error::Config(format!(
                "max_duration_sec must be in (0, {}], got {}",
                MAX_DURATION_SEC, pipeline.max_duration_sec
            )));
        }

        let tts_timeout = millis(
            "TTS_TIMEOUT_MS",
            pipeline_toml.tts_timeout_ms,
            Duration::from_millis(DEFAULT_TTS_TIMEOUT_MS),
        );
        let max_upload_bytes = pipeline_toml
            .max_upload_bytes
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let deepgram = DeepgramSettings {
            api_key: resolve_api_key(
                "Deepgram",
                DEEPGRAM_API_KEY_ENV,
                toml_config.deepgram.api_key.as_deref(),
                "[deepgram] api_key",
            )?,
            base_url: toml_config
                .deepgram
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_DEEPGRAM_BASE_URL.to_string()),
            transcription_model: toml_config
                .deepgram
                .transcription_model
                .clone()
                .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string()),
            tts_model: env_string(DEEPGRAM_TTS_MODEL_ENV)
                .or(toml_config.deepgram.tts_model.clone())
                .unwrap_or_else(|| DEFAULT_TTS_MODEL.to_string()),
        };

        let openrouter = OpenRouterSettings {
            api_key: resolve_api_key(
                "OpenRouter",
                OPENROUTER_API_KEY_ENV,
                toml_config.openrouter.api_key.as_deref(),
                "[openrouter] api_key",
            )?,
            base_url: toml_config
                .openrouter
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENROUTER_BASE_URL.to_string()),
            model: env_string(OPENROUTER_MODEL_ENV)
                .or(toml_config.openrouter.model.clone())
                .unwrap_or_else(|| DEFAULT_OPENROUTER_MODEL.to_string()),
        };

        Ok(Self {
            root_folder,
            listen_addr: format!("{}:{}", bind, port),
            logging: toml_config.logging,
            pipeline,
            tts_timeout,
            max_upload_bytes,
            deepgram,
            openrouter,
        })
    }
}

/// Non-blank environment value
fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Numeric environment value; unparsable values are ignored with a warning
fn env_u64(name: &str) -> Option<u64> {
    let value = env_string(name)?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Ignoring {}={}: not a non-negative integer", name, value);
            None
        }
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve a provider API key
///
/// **Priority:** ENV → TOML
pub fn resolve_api_key(
    provider: &str,
    env_name: &str,
    toml_key: Option<&str>,
    toml_hint: &str,
) -> Result<String> {
    let env_key = std::env::var(env_name).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_key.filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} API key found in multiple sources: environment, TOML. Using environment (highest priority).",
            provider
        );
    }

    if let Some(key) = env_key {
        info!("{} API key loaded from environment variable", provider);
        return Ok(key.trim().to_string());
    }

    if let Some(key) = toml_key {
        info!("{} API key loaded from TOML config", provider);
        return Ok(key.trim().to_string());
    }

    Err(Error::Config(format!(
        "{} API key not configured. Please configure using one of:\n\
         1. Environment: {}=your-key-here\n\
         2. TOML config: ~/.config/evalio/{}.toml ({} = \"your-key\")",
        provider, env_name, MODULE_NAME, toml_hint
    )))
}
