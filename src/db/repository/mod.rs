//! Repositories over the SQLite pool.

mod question;
mod voice;

pub use question::QuestionRepository;
pub use voice::{SoftDeleted, VoiceRepository};
