//! Per-question processing locks
//!
//! A lock row `(session_id, question_id)` means "an evaluation is in flight".
//! State machine per question:
//! - UNLOCKED → LOCKED on successful acquisition
//! - LOCKED → UNLOCKED on release by the owner, on answer persistence by the
//!   owner (see `answers::persist_answer`), or on reclamation once older than
//!   the staleness threshold
//!
//! There is no background sweeper: stale locks are reclaimed lazily by the
//! next acquisition attempt for the same question.

use chrono::{DateTime, Utc};
use evalio_common::time::{from_epoch_millis, to_epoch_millis};
use evalio_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use std::time::Duration;
use uuid::Uuid;

use crate::models::ProcessingLock;
use crate::utils::retry_on_lock;

/// Result of an acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAcquisition {
    /// The lock is now held by the requesting attempt
    Acquired,
    /// An answer exists or another live lock is held; nothing was written
    NotAcquired,
}

/// Atomically acquire the lock for `(session_id, question_id)`
///
/// In one write transaction:
/// 1. delete a lock for this question older than `stale_after`
/// 2. insert a lock tagged `request_id`, only if no answer exists and no
///    lock remains (primary key)
///
/// Never waits for the current holder. Callers re-check for a persisted
/// answer on `NotAcquired`.
pub async fn try_acquire_lock(
    pool: &SqlitePool,
    session_id: Uuid,
    question_id: &str,
    request_id: Uuid,
    now: DateTime<Utc>,
    stale_after: Duration,
    max_wait_ms: u64,
) -> Result<LockAcquisition> {
    let session_id = session_id.to_string();
    let request_id = request_id.to_string();
    let now_ms = to_epoch_millis(now);
    let stale_before_ms = now_ms.saturating_sub(stale_after.as_millis() as i64);

    let (reclaimed, inserted) = retry_on_lock("acquire_processing_lock", max_wait_ms, || async {
        let mut tx = pool.begin().await?;

        let reclaimed = sqlx::query(
            r#"
            DELETE FROM processing_locks
            WHERE session_id = ? AND question_id = ? AND started_at_ms < ?
            "#,
        )
        .bind(&session_id)
        .bind(question_id)
        .bind(stale_before_ms)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO processing_locks (session_id, question_id, request_id, started_at_ms)
            SELECT ?1, ?2, ?3, ?4
            WHERE NOT EXISTS (
                SELECT 1 FROM answers WHERE session_id = ?1 AND question_id = ?2
            )
            "#,
        )
        .bind(&session_id)
        .bind(question_id)
        .bind(&request_id)
        .bind(now_ms)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok::<_, Error>((reclaimed, inserted))
    })
    .await?;

    if reclaimed > 0 {
        tracing::info!(
            session_id = %session_id,
            question_id,
            stale_after_ms = stale_after.as_millis() as u64,
            "Reclaimed stale processing lock"
        );
    }

    if inserted == 1 {
        tracing::debug!(session_id = %session_id, question_id, request_id = %request_id, "Processing lock acquired");
        Ok(LockAcquisition::Acquired)
    } else {
        tracing::debug!(session_id = %session_id, question_id, "Processing lock not acquired");
        Ok(LockAcquisition::NotAcquired)
    }
}

/// Release a lock held by `request_id`
///
/// Returns false when the lock was no longer held by this request (already
/// cleared by persistence or reclaimed as stale).
pub async fn release_lock(
    pool: &SqlitePool,
    session_id: Uuid,
    question_id: &str,
    request_id: Uuid,
    max_wait_ms: u64,
) -> Result<bool> {
    let session_id = session_id.to_string();
    let request_id = request_id.to_string();

    let released = retry_on_lock("release_processing_lock", max_wait_ms, || async {
        let result = sqlx::query(
            r#"
            DELETE FROM processing_locks
            WHERE session_id = ? AND question_id = ? AND request_id = ?
            "#,
        )
        .bind(&session_id)
        .bind(question_id)
        .bind(&request_id)
        .execute(pool)
        .await?;
        Ok::<_, Error>(result.rows_affected())
    })
    .await?;

    tracing::debug!(
        session_id = %session_id,
        question_id,
        request_id = %request_id,
        released = released > 0,
        "Processing lock release"
    );

    Ok(released > 0)
}

/// All locks currently recorded for a session
pub async fn list_locks(pool: &SqlitePool, session_id: Uuid) -> Result<Vec<ProcessingLock>> {
    let rows = sqlx::query(
        r#"
        SELECT question_id, request_id, started_at_ms
        FROM processing_locks
        WHERE session_id = ?
        ORDER BY started_at_ms
        "#,
    )
    .bind(session_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let request_id: String = row.get("request_id");
            let request_id = Uuid::parse_str(&request_id)
                .map_err(|e| Error::Internal(format!("Failed to parse request_id: {}", e)))?;
            Ok::<_, Error>(ProcessingLock {
                question_id: row.get("question_id"),
                request_id,
                started_at: from_epoch_millis(row.get("started_at_ms")),
            })
        })
        .collect()
}
