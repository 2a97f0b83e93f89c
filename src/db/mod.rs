//! Database Module
//!
//! SQLite persistence for voice records and practice questions, built on `sqlx`.

pub mod models;
pub mod repository;

pub use models::{NewVoice, Question, VoiceRecord, VoiceState};
pub use repository::{QuestionRepository, SoftDeleted, VoiceRepository};

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Errors raised by the record store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to open database: {0}")]
    Connection(String),

    #[error("corrupt {column} in voice {id}: {reason}")]
    Corrupt {
        id: String,
        column: &'static str,
        reason: String,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// How long a connection waits on a locked database before failing with `SQLITE_BUSY`
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MIGRATIONS: &str = r#"
    CREATE TABLE IF NOT EXISTS voices (
        id              TEXT PRIMARY KEY NOT NULL,
        duration_s      INTEGER NOT NULL CHECK (duration_s >= 0),
        file            TEXT,
        language        TEXT,
        text            TEXT,
        words           TEXT,
        request_country TEXT,
        analysis        TEXT,
        created_at      TEXT NOT NULL,
        deleted_at      TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_voices_active
        ON voices (deleted_at);
    CREATE TABLE IF NOT EXISTS questions (
        id      INTEGER PRIMARY KEY AUTOINCREMENT,
        text    TEXT NOT NULL
    );
"#;

/// Shared SQLite connection pool
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database file at `path`.
    pub async fn connect(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("cannot create {:?}: {}", parent, e))
            })?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::debug!("Connected to database at {:?}", path);
        Ok(Self { pool })
    }

    /// Private in-memory database. A single connection keeps every query on the same db.
    pub async fn connect_in_memory() -> StoreResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Create tables and indexes. Idempotent.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        // sqlx runs one statement per call
        for stmt in MIGRATIONS.split(';') {
            let trimmed = stmt.trim();
            if trimmed.is_empty() {
                continue;
            }
            sqlx::query(trimmed).execute(&self.pool).await?;
        }
        tracing::debug!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
