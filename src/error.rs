//! Error types for the hyperplay crate

use thiserror::Error;

/// Main error type for the hyperplay crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("duplicate frame: model already holds {have} frames, cannot push step {step}")]
    DuplicateFrame { step: usize, have: usize },

    #[error("no legal moves for role {role} in the given state")]
    NoLegalMoves { role: usize },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}
