//! Answer evaluation services
//!
//! Pure analysis (audio validation, speech metrics, score aggregation),
//! provider seams with their Deepgram/OpenRouter implementations, and the
//! orchestrator composing them with the lock manager and answer persister.

pub mod audio_validator;
pub mod content_schema;
pub mod deepgram_client;
pub mod error;
pub mod evaluation_orchestrator;
pub mod openrouter_client;
pub mod providers;
pub mod score_aggregator;
pub mod speech_metrics;

pub use audio_validator::validate_audio;
pub use deepgram_client::DeepgramClient;
pub use error::EvaluationError;
pub use evaluation_orchestrator::{
    AnswerSubmission, EvaluationOrchestrator, PipelineSettings, UploadedAudio,
};
pub use openrouter_client::OpenRouterClient;
pub use providers::{
    with_timeout, ContentEvaluation, ContentEvaluationRequest, ContentEvaluator,
    SpeechSynthesizer, Transcriber, Transcription,
};
pub use speech_metrics::{analyze_speech, SpeechAnalysis};
