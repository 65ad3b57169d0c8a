//! Data models for evalio-ae (Answer Evaluator)

pub mod answer;
pub mod session;

pub use answer::{AiMeta, Answer, AudioFileRef, SpeechMetrics, SubmissionOutcome};
pub use session::{
    Difficulty, InterviewSession, InterviewType, ProcessingLock, Question, QuestionCategory,
    SessionStatus,
};
