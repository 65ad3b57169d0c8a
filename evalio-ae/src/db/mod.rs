//! Database access for evalio-ae
//!
//! The interview session is stored across three tables that are only ever
//! mutated together through conditional statements:
//! - `interview_sessions`: the session record and its question list
//! - `answers`: at most one row per (session, question)
//! - `processing_locks`: at most one row per (session, question)

pub mod answers;
pub mod locks;
pub mod sessions;

pub use answers::PersistOutcome;
pub use locks::LockAcquisition;

use evalio_common::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// SQLite busy handler timeout; lock contention beyond this goes to `retry_on_lock`
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialize database connection pool
///
/// Creates the database file and tables if missing.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with tables created
///
/// Every connection to `:memory:` is a separate database, so the pool is
/// capped at one connection.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create evalio-ae tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interview_sessions (
            session_id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            interview_type TEXT NOT NULL,
            difficulty TEXT NOT NULL,
            questions TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS answers (
            answer_id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL
                REFERENCES interview_sessions(session_id) ON DELETE CASCADE,
            question_id TEXT NOT NULL,
            body TEXT NOT NULL,
            evaluated_at TEXT NOT NULL,
            UNIQUE (session_id, question_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS processing_locks (
            session_id TEXT NOT NULL
                REFERENCES interview_sessions(session_id) ON DELETE CASCADE,
            question_id TEXT NOT NULL,
            request_id TEXT NOT NULL,
            started_at_ms INTEGER NOT NULL,
            PRIMARY KEY (session_id, question_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (interview_sessions, answers, processing_locks)");

    Ok(())
}
