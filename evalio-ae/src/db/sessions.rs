//! Interview session database operations
//!
//! Sessions are created by the interview setup service; this service only
//! reads them (plus the seeding helper used by setup tooling and tests).

use chrono::{DateTime, Utc};
use evalio_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{Difficulty, InterviewSession, InterviewType, Question};

/// Insert a new session record
pub async fn insert_session(pool: &SqlitePool, session: &InterviewSession) -> Result<()> {
    let questions = serde_json::to_string(&session.questions)
        .map_err(|e| Error::Internal(format!("Failed to serialize questions: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO interview_sessions (
            session_id, user_id, interview_type, difficulty, questions, created_at
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session.session_id.to_string())
    .bind(&session.user_id)
    .bind(session.interview_type.as_str())
    .bind(session.difficulty.as_str())
    .bind(&questions)
    .bind(session.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a session together with its answers and in-flight locks
pub async fn load_session(pool: &SqlitePool, session_id: Uuid) -> Result<Option<InterviewSession>> {
    let row = sqlx::query(
        r#"
        SELECT session_id, user_id, interview_type, difficulty, questions, created_at
        FROM interview_sessions
        WHERE session_id = ?
        "#,
    )
    .bind(session_id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let interview_type: String = row.get("interview_type");
    let interview_type: InterviewType = interview_type.parse().map_err(Error::Internal)?;

    let difficulty: String = row.get("difficulty");
    let difficulty: Difficulty = difficulty.parse().map_err(Error::Internal)?;

    let questions: String = row.get("questions");
    let questions: Vec<Question> = serde_json::from_str(&questions)
        .map_err(|e| Error::Internal(format!("Failed to deserialize questions: {}", e)))?;

    let created_at: String = row.get("created_at");
    let created_at = parse_timestamp(&created_at, "created_at")?;

    let answers = super::answers::list_answers(pool, session_id).await?;
    let processing_locks = super::locks::list_locks(pool, session_id).await?;

    Ok(Some(InterviewSession {
        session_id,
        user_id: row.get("user_id"),
        interview_type,
        difficulty,
        questions,
        answers,
        processing_locks,
        created_at,
    }))
}

pub(crate) fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}
