//! Error types for bichat.

use thiserror::Error;

/// Shared error type for the session layer.
///
/// "Not found" is deliberately not an error: lookups return `Option`, deletes
/// return `bool`. Classification failures never surface here either; the
/// router downgrades them to a safe-fallback routing decision.
#[derive(Error, Debug)]
pub enum Error {
    /// Durable store unreachable, corrupt, or schema mismatch.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Session history or timestamps failed to round-trip.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for Error {
    fn from(err: chrono::ParseError) -> Self {
        Self::Serialization(format!("invalid timestamp: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
