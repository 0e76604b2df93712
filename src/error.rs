//! Crate error type
//!
//! Only the collaborators (level catalog, progress book, tuning loader) can
//! fail. The simulation itself reports player-facing failures as events.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("level {0} not found")]
    LevelNotFound(u32),
    #[error("malformed JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid tuning: {0}")]
    InvalidTuning(String),
}

pub type Result<T> = std::result::Result<T, Error>;
