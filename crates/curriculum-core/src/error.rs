//! Error types for curriculum environments

use thiserror::Error;

/// Result type for curriculum operations
pub type Result<T> = std::result::Result<T, CurriculumError>;

/// Error produced inside a reward term's own computation.
pub type TermError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Curriculum error types
#[derive(Debug, Error)]
pub enum CurriculumError {
    /// A declared slot has no reward term bound to it
    #[error("no reward term bound at index {index} (curriculum declares indices 0..={last})")]
    UnboundIndex { index: usize, last: usize },

    /// Two terms were bound to the same slot
    #[error("reward term slot {index} bound twice (`{existing}`, then `{duplicate}`)")]
    DuplicateIndex {
        index: usize,
        existing: String,
        duplicate: String,
    },

    /// A term was bound outside the declared index range
    #[error("reward term `{name}` bound at index {index}, outside declared range 0..={last}")]
    IndexOutOfRange {
        name: String,
        index: usize,
        last: usize,
    },

    /// A reward term failed while computing its value
    #[error("reward term {index} (`{name}`) failed")]
    TermFailed {
        index: usize,
        name: String,
        #[source]
        source: TermError,
    },

    /// Action rejected by the environment
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// Curriculum stage name not recognized by the environment
    #[error("unknown task `{0}`")]
    UnknownTask(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CurriculumError {
    fn from(err: serde_json::Error) -> Self {
        CurriculumError::Serialization(err.to_string())
    }
}
