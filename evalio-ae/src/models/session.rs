//! Interview session record
//!
//! The session row is the synchronization point of the evaluation pipeline:
//! it owns its questions, its answers (at most one per question) and its
//! processing locks (at most one per question).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use super::Answer;

/// Interview flavour, also used as the category of individual questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewType {
    Technical,
    Behavioral,
    Case,
}

/// Question categories share the interview type vocabulary
pub type QuestionCategory = InterviewType;

impl InterviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewType::Technical => "technical",
            InterviewType::Behavioral => "behavioral",
            InterviewType::Case => "case",
        }
    }
}

impl FromStr for InterviewType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "technical" => Ok(InterviewType::Technical),
            "behavioral" => Ok(InterviewType::Behavioral),
            "case" => Ok(InterviewType::Case),
            other => Err(format!("unknown interview type '{}'", other)),
        }
    }
}

impl fmt::Display for InterviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interview difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generated interview question (immutable after session creation)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub category: QuestionCategory,
}

/// Marker that an evaluation is in flight for one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingLock {
    pub question_id: String,
    pub request_id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl ProcessingLock {
    /// Whether a new request may reclaim this lock
    pub fn is_stale(&self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        let age = now.signed_duration_since(self.started_at);
        age.to_std().map(|age| age > stale_after).unwrap_or(false)
    }
}

/// Derived completion status, never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

/// Interview session with its answers and in-flight locks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSession {
    pub session_id: Uuid,
    /// Owning user id as forwarded by the authentication gateway
    pub user_id: String,
    pub interview_type: InterviewType,
    pub difficulty: Difficulty,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
    pub processing_locks: Vec<ProcessingLock>,
    pub created_at: DateTime<Utc>,
}

impl InterviewSession {
    /// New session without answers or locks
    pub fn new(
        user_id: impl Into<String>,
        interview_type: InterviewType,
        difficulty: Difficulty,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id: user_id.into(),
            interview_type,
            difficulty,
            questions,
            answers: Vec::new(),
            processing_locks: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&Answer> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }

    pub fn lock_for(&self, question_id: &str) -> Option<&ProcessingLock> {
        self.processing_locks
            .iter()
            .find(|l| l.question_id == question_id)
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Completed once every question has an answer
    pub fn status(&self) -> SessionStatus {
        if !self.questions.is_empty() && self.answers.len() == self.questions.len() {
            SessionStatus::Completed
        } else {
            SessionStatus::InProgress
        }
    }

    pub fn answered_question_ids(&self) -> Vec<String> {
        self.answers.iter().map(|a| a.question_id.clone()).collect()
    }
}
