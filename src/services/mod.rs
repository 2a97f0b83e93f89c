//! Service Layer
//!
//! Business operations on top of the repositories and the two external
//! clients. Handlers and CLI commands talk to these, never to sqlx directly.

mod question;
mod stats;
mod voice;

pub use question::QuestionService;
pub use stats::StatsService;
pub use voice::{VoiceService, VoiceUpload};

use sqlx::SqlitePool;

/// Shared handles every service is built from
#[derive(Clone, Debug)]
pub struct ServiceContext {
    pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
