//! Library error type.
//! Source failures are surfaced to the caller of a sync; corrupt archives and
//! bad recommendation requests never reach this type, they are absorbed
//! where they happen.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LottoError {
    // ---------------------------
    // Draw source
    // ---------------------------
    #[error("Draw source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Draw source contract violation: {reason} (head=\"{excerpt}\")")]
    SourceContractViolation { reason: String, excerpt: String },

    #[error("Probe limit of {limit} requests reached before the source was exhausted")]
    ProbeLimitExceeded { limit: u32 },

    #[error("A synchronization is already in progress")]
    SyncInProgress,

    // ---------------------------
    // Persistence
    // ---------------------------
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl LottoError {
    /// Build a contract violation carrying a short, single-line excerpt of
    /// the offending payload.
    pub fn contract(reason: impl Into<String>, payload: &str) -> Self {
        LottoError::SourceContractViolation {
            reason: reason.into(),
            excerpt: crate::utils::payload_excerpt(payload),
        }
    }
}

pub type LottoResult<T> = Result<T, LottoError>;
