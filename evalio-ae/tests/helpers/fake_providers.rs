//! Scripted provider implementations
//!
//! Each fake counts its calls and can be slowed down to hold the processing
//! lock open while a second request arrives.

use async_trait::async_trait;
use evalio_ae::services::{
    ContentEvaluation, ContentEvaluationRequest, ContentEvaluator, EvaluationError,
    SpeechSynthesizer, Transcriber, Transcription,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// 34 words, 3 fillers
pub const FLUENT_TRANSCRIPT: &str = "I designed a read through cache in front of our pricing \
    service um keyed by product and region and we invalidated entries on write events so \
    basically stale prices never lasted more than seconds";

pub struct FakeTranscriber {
    transcript: String,
    confidence: f64,
    delay: Duration,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeTranscriber {
    pub fn new(transcript: &str, confidence: f64) -> Self {
        Self {
            transcript: transcript.to_string(),
            confidence,
            delay: Duration::ZERO,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fluent() -> Self {
        Self::new(FLUENT_TRANSCRIPT, 0.93)
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::fluent()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(
        &self,
        _audio: Vec<u8>,
        _mime_type: &str,
    ) -> Result<Transcription, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(EvaluationError::TranscriptionFailed(
                "Deepgram returned 503".to_string(),
            ));
        }
        Ok(Transcription {
            transcript: self.transcript.clone(),
            confidence: self.confidence,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorBehavior {
    Succeed,
    /// Provider answered with an HTTP error
    Fail,
    /// Provider answered with text that is not the expected JSON
    InvalidResponse,
}

pub struct FakeEvaluator {
    behavior: EvaluatorBehavior,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeEvaluator {
    pub fn new(behavior: EvaluatorBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Content scores returned by a succeeding `FakeEvaluator`
pub fn sample_evaluation() -> ContentEvaluation {
    ContentEvaluation {
        relevance: 80,
        technical_depth: 70,
        clarity: 75,
        strong_points: vec!["Concrete example".to_string()],
        weak_points: vec!["No metrics on hit rate".to_string()],
        feedback: "Solid answer; quantify the impact next time.".to_string(),
    }
}

#[async_trait]
impl ContentEvaluator for FakeEvaluator {
    async fn evaluate(
        &self,
        _request: &ContentEvaluationRequest,
    ) -> Result<ContentEvaluation, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match self.behavior {
            EvaluatorBehavior::Succeed => Ok(sample_evaluation()),
            EvaluatorBehavior::Fail => Err(EvaluationError::EvaluationFailed(
                "OpenRouter returned 500".to_string(),
            )),
            EvaluatorBehavior::InvalidResponse => Err(EvaluationError::EvaluationParseError(
                "expected value at line 1 column 1".to_string(),
            )),
        }
    }
}

pub struct FakeSynthesizer {
    fail: bool,
    delay: Duration,
    spoken: Mutex<Vec<String>>,
}

impl FakeSynthesizer {
    pub fn new() -> Self {
        Self {
            fail: false,
            delay: Duration::ZERO,
            spoken: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Texts passed to `synthesize`, in call order
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, EvaluationError> {
        self.spoken.lock().unwrap().push(text.to_string());
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(EvaluationError::SynthesisFailed(
                "Deepgram returned 429".to_string(),
            ));
        }
        Ok(b"ID3fake-mpeg-frames".to_vec())
    }
}
