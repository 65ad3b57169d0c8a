//! Answer persistence
//!
//! An answer is written at most once per (session, question). The write is
//! conditioned on the caller still owning the processing lock, and clears
//! that lock in the same transaction.

use evalio_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::Answer;
use crate::utils::retry_on_lock;

/// Result of a persistence attempt
#[derive(Debug, Clone, PartialEq)]
pub enum PersistOutcome {
    /// The answer was written and the lock removed
    Persisted(Answer),
    /// Another request already stored an answer; it is returned unchanged
    Replayed(Answer),
    /// The lock was no longer held by this request and no answer exists
    /// (reclaimed as stale by a newer attempt that has not finished yet)
    LockLost,
}

fn decode_answer(body: &str) -> Result<Answer> {
    serde_json::from_str(body)
        .map_err(|e| Error::Internal(format!("Failed to deserialize answer: {}", e)))
}

/// Stored answer for one question, if any
pub async fn find_answer(
    pool: &SqlitePool,
    session_id: Uuid,
    question_id: &str,
) -> Result<Option<Answer>> {
    let body: Option<String> = sqlx::query_scalar(
        r#"
        SELECT body FROM answers
        WHERE session_id = ? AND question_id = ?
        "#,
    )
    .bind(session_id.to_string())
    .bind(question_id)
    .fetch_optional(pool)
    .await?;

    body.as_deref().map(decode_answer).transpose()
}

/// All answers of a session in evaluation order
pub async fn list_answers(pool: &SqlitePool, session_id: Uuid) -> Result<Vec<Answer>> {
    let rows = sqlx::query(
        r#"
        SELECT body FROM answers
        WHERE session_id = ?
        ORDER BY evaluated_at, answer_id
        "#,
    )
    .bind(session_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let body: String = row.get("body");
            decode_answer(&body)
        })
        .collect()
}

/// Atomically store `answer` and clear the lock held by `request_id`
///
/// Conditions checked inside one write transaction:
/// - the lock for the question is held by `request_id`
/// - no answer exists for the question
///
/// If either fails nothing is written. An existing answer is then returned as
/// `Replayed`; the caller discards its computed result.
pub async fn persist_answer(
    pool: &SqlitePool,
    session_id: Uuid,
    request_id: Uuid,
    answer: &Answer,
    max_wait_ms: u64,
) -> Result<PersistOutcome> {
    let session_id_str = session_id.to_string();
    let request_id_str = request_id.to_string();
    let body = serde_json::to_string(answer)
        .map_err(|e| Error::Internal(format!("Failed to serialize answer: {}", e)))?;

    let written = retry_on_lock("persist_answer", max_wait_ms, || async {
        let mut tx = pool.begin().await?;

        let lock_cleared = sqlx::query(
            r#"
            DELETE FROM processing_locks
            WHERE session_id = ? AND question_id = ? AND request_id = ?
            "#,
        )
        .bind(&session_id_str)
        .bind(&answer.question_id)
        .bind(&request_id_str)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if lock_cleared == 0 {
            tx.rollback().await?;
            return Ok::<_, Error>(false);
        }

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO answers (answer_id, session_id, question_id, body, evaluated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(answer.answer_id.to_string())
        .bind(&session_id_str)
        .bind(&answer.question_id)
        .bind(&body)
        .bind(answer.evaluated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    })
    .await?;

    if written {
        tracing::info!(
            session_id = %session_id,
            question_id = %answer.question_id,
            request_id = %request_id,
            overall = answer.scores.overall,
            "Answer persisted"
        );
        return Ok(PersistOutcome::Persisted(answer.clone()));
    }

    match find_answer(pool, session_id, &answer.question_id).await? {
        Some(existing) => {
            tracing::info!(
                session_id = %session_id,
                question_id = %answer.question_id,
                request_id = %request_id,
                "Answer already persisted by another request, discarding result"
            );
            Ok(PersistOutcome::Replayed(existing))
        }
        None => {
            tracing::warn!(
                session_id = %session_id,
                question_id = %answer.question_id,
                request_id = %request_id,
                "Processing lock lost before persistence"
            );
            Ok(PersistOutcome::LockLost)
        }
    }
}
