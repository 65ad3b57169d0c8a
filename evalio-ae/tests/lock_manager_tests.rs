//! Processing lock and answer persistence tests
//!
//! Exercise the storage-level guarantees directly: one live lock per
//! question, lazy stale reclamation, owner-only release, and at most one
//! answer per question.

mod helpers;

use chrono::{Duration as ChronoDuration, Utc};
use evalio_ae::db::answers::{find_answer, list_answers, persist_answer};
use evalio_ae::db::locks::{list_locks, release_lock, try_acquire_lock};
use evalio_ae::db::{LockAcquisition, PersistOutcome};
use evalio_ae::models::{AiMeta, Answer, AudioFileRef, SpeechMetrics};
use evalio_common::AnswerScores;
use helpers::{create_test_db, seed_session, OWNER};
use std::time::Duration;
use uuid::Uuid;

const STALE_AFTER: Duration = Duration::from_secs(120);
const MAX_WAIT_MS: u64 = 2000;

fn answer_for(question_id: &str, transcript: &str) -> Answer {
    Answer {
        answer_id: Uuid::new_v4(),
        question_id: question_id.to_string(),
        duration_sec: 30.0,
        transcript: transcript.to_string(),
        audio_file: AudioFileRef {
            original_name: "answer.webm".to_string(),
            stored_name: "answer-1-abc.webm".to_string(),
            mime_type: "audio/webm".to_string(),
            size: 180_000,
            storage_path: "/tmp/answer-1-abc.webm".to_string(),
        },
        speech_metrics: SpeechMetrics {
            word_count: 30,
            filler_word_count: 1,
            pause_count: 2,
            words_per_minute: 60.0,
            disfluency_ratio: 0.033,
        },
        scores: AnswerScores {
            relevance: 80,
            technical_depth: 70,
            clarity: 75,
            fluency: 90,
            speech_flow_score: 85,
            overall: 79,
        },
        strong_points: vec!["Clear structure".to_string()],
        weak_points: vec![],
        feedback: "Good.".to_string(),
        ai_meta: AiMeta {
            transcription_ms: 900,
            evaluation_ms: 1800,
        },
        evaluated_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_first_attempt_acquires_second_does_not() {
    let (_temp, pool) = create_test_db().await;
    let session = seed_session(&pool, OWNER).await;
    let now = Utc::now();

    let first = try_acquire_lock(&pool, session.session_id, "q1", Uuid::new_v4(), now, STALE_AFTER, MAX_WAIT_MS)
        .await
        .unwrap();
    let second = try_acquire_lock(&pool, session.session_id, "q1", Uuid::new_v4(), now, STALE_AFTER, MAX_WAIT_MS)
        .await
        .unwrap();

    assert_eq!(first, LockAcquisition::Acquired);
    assert_eq!(second, LockAcquisition::NotAcquired);
    assert_eq!(list_locks(&pool, session.session_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_locks_are_per_question() {
    let (_temp, pool) = create_test_db().await;
    let session = seed_session(&pool, OWNER).await;
    let now = Utc::now();

    for question_id in ["q1", "q2"] {
        let acquisition = try_acquire_lock(
            &pool,
            session.session_id,
            question_id,
            Uuid::new_v4(),
            now,
            STALE_AFTER,
            MAX_WAIT_MS,
        )
        .await
        .unwrap();
        assert_eq!(acquisition, LockAcquisition::Acquired, "question {}", question_id);
    }
}

#[tokio::test]
async fn test_stale_lock_is_reclaimed() {
    let (_temp, pool) = create_test_db().await;
    let session = seed_session(&pool, OWNER).await;
    let crashed = Uuid::new_v4();
    let retry = Uuid::new_v4();

    let old = Utc::now() - ChronoDuration::seconds(300);
    try_acquire_lock(&pool, session.session_id, "q1", crashed, old, STALE_AFTER, MAX_WAIT_MS)
        .await
        .unwrap();

    let acquisition = try_acquire_lock(&pool, session.session_id, "q1", retry, Utc::now(), STALE_AFTER, MAX_WAIT_MS)
        .await
        .unwrap();
    assert_eq!(acquisition, LockAcquisition::Acquired);

    let locks = list_locks(&pool, session.session_id).await.unwrap();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].request_id, retry);
}

#[tokio::test]
async fn test_fresh_lock_is_not_reclaimed() {
    let (_temp, pool) = create_test_db().await;
    let session = seed_session(&pool, OWNER).await;
    let holder = Uuid::new_v4();

    let recent = Utc::now() - ChronoDuration::seconds(60);
    try_acquire_lock(&pool, session.session_id, "q1", holder, recent, STALE_AFTER, MAX_WAIT_MS)
        .await
        .unwrap();

    let acquisition = try_acquire_lock(&pool, session.session_id, "q1", Uuid::new_v4(), Utc::now(), STALE_AFTER, MAX_WAIT_MS)
        .await
        .unwrap();
    assert_eq!(acquisition, LockAcquisition::NotAcquired);
    assert_eq!(list_locks(&pool, session.session_id).await.unwrap()[0].request_id, holder);
}

#[tokio::test]
async fn test_release_only_by_owner() {
    let (_temp, pool) = create_test_db().await;
    let session = seed_session(&pool, OWNER).await;
    let owner = Uuid::new_v4();

    try_acquire_lock(&pool, session.session_id, "q1", owner, Utc::now(), STALE_AFTER, MAX_WAIT_MS)
        .await
        .unwrap();

    let foreign = release_lock(&pool, session.session_id, "q1", Uuid::new_v4(), MAX_WAIT_MS)
        .await
        .unwrap();
    assert!(!foreign);
    assert_eq!(list_locks(&pool, session.session_id).await.unwrap().len(), 1);

    let released = release_lock(&pool, session.session_id, "q1", owner, MAX_WAIT_MS)
        .await
        .unwrap();
    assert!(released);
    assert!(list_locks(&pool, session.session_id).await.unwrap().is_empty());

    // Unlocked again: a new attempt may proceed
    let acquisition = try_acquire_lock(&pool, session.session_id, "q1", Uuid::new_v4(), Utc::now(), STALE_AFTER, MAX_WAIT_MS)
        .await
        .unwrap();
    assert_eq!(acquisition, LockAcquisition::Acquired);
}

#[tokio::test]
async fn test_persist_clears_lock_and_blocks_new_locks() {
    let (_temp, pool) = create_test_db().await;
    let session = seed_session(&pool, OWNER).await;
    let request_id = Uuid::new_v4();

    try_acquire_lock(&pool, session.session_id, "q1", request_id, Utc::now(), STALE_AFTER, MAX_WAIT_MS)
        .await
        .unwrap();

    let answer = answer_for("q1", "first answer");
    let outcome = persist_answer(&pool, session.session_id, request_id, &answer, MAX_WAIT_MS)
        .await
        .unwrap();
    assert_eq!(outcome, PersistOutcome::Persisted(answer.clone()));
    assert!(list_locks(&pool, session.session_id).await.unwrap().is_empty());

    // An answered question can never be locked again
    let acquisition = try_acquire_lock(&pool, session.session_id, "q1", Uuid::new_v4(), Utc::now(), STALE_AFTER, MAX_WAIT_MS)
        .await
        .unwrap();
    assert_eq!(acquisition, LockAcquisition::NotAcquired);

    let stored = find_answer(&pool, session.session_id, "q1").await.unwrap();
    assert_eq!(stored, Some(answer));
}

#[tokio::test]
async fn test_persist_after_reclaim_replays_winner() {
    let (_temp, pool) = create_test_db().await;
    let session = seed_session(&pool, OWNER).await;
    let slow = Uuid::new_v4();
    let fast = Uuid::new_v4();

    let old = Utc::now() - ChronoDuration::seconds(300);
    try_acquire_lock(&pool, session.session_id, "q1", slow, old, STALE_AFTER, MAX_WAIT_MS)
        .await
        .unwrap();
    try_acquire_lock(&pool, session.session_id, "q1", fast, Utc::now(), STALE_AFTER, MAX_WAIT_MS)
        .await
        .unwrap();

    let winner = answer_for("q1", "fast answer");
    persist_answer(&pool, session.session_id, fast, &winner, MAX_WAIT_MS)
        .await
        .unwrap();

    // The reclaimed request finishes late; its result is discarded
    let late = answer_for("q1", "slow answer");
    let outcome = persist_answer(&pool, session.session_id, slow, &late, MAX_WAIT_MS)
        .await
        .unwrap();
    assert_eq!(outcome, PersistOutcome::Replayed(winner.clone()));

    let answers = list_answers(&pool, session.session_id).await.unwrap();
    assert_eq!(answers, vec![winner]);
}

#[tokio::test]
async fn test_persist_without_lock_reports_lock_lost() {
    let (_temp, pool) = create_test_db().await;
    let session = seed_session(&pool, OWNER).await;
    let slow = Uuid::new_v4();
    let fast = Uuid::new_v4();

    let old = Utc::now() - ChronoDuration::seconds(300);
    try_acquire_lock(&pool, session.session_id, "q1", slow, old, STALE_AFTER, MAX_WAIT_MS)
        .await
        .unwrap();
    try_acquire_lock(&pool, session.session_id, "q1", fast, Utc::now(), STALE_AFTER, MAX_WAIT_MS)
        .await
        .unwrap();

    let outcome = persist_answer(&pool, session.session_id, slow, &answer_for("q1", "late"), MAX_WAIT_MS)
        .await
        .unwrap();
    assert_eq!(outcome, PersistOutcome::LockLost);

    assert!(find_answer(&pool, session.session_id, "q1").await.unwrap().is_none());
    let locks = list_locks(&pool, session.session_id).await.unwrap();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].request_id, fast);
}

#[tokio::test]
async fn test_concurrent_acquisitions_admit_exactly_one() {
    let (_temp, pool) = create_test_db().await;
    let session = seed_session(&pool, OWNER).await;
    let now = Utc::now();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = pool.clone();
        let session_id = session.session_id;
        handles.push(tokio::spawn(async move {
            try_acquire_lock(&pool, session_id, "q1", Uuid::new_v4(), now, STALE_AFTER, MAX_WAIT_MS)
                .await
                .unwrap()
        }));
    }

    let mut acquired = 0;
    for handle in handles {
        if handle.await.unwrap() == LockAcquisition::Acquired {
            acquired += 1;
        }
    }
    assert_eq!(acquired, 1);
}
