//! Error types for MemoWrite

use thiserror::Error;
use uuid::Uuid;

use crate::grader::GraderError;
use crate::scheduler::SchedulerError;

/// Main error type for MemoWrite operations
#[derive(Error, Debug)]
pub enum MemoWriteError {
    /// Rejected quality signal or corrupted memory state
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// External grading service errors
    #[error("Grader error: {0}")]
    Grader(#[from] GraderError),

    /// Storage-related errors (store database, persistence)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Question/answer extraction errors
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// No item with the given id
    #[error("Item not found: {0}")]
    NotFound(Uuid),

    /// Learner answer rejected before grading
    #[error("Invalid answer: {0}")]
    InvalidAnswer(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for MemoWriteError {
    fn from(e: serde_json::Error) -> Self {
        MemoWriteError::Serialization(e.to_string())
    }
}

impl From<rusqlite::Error> for MemoWriteError {
    fn from(e: rusqlite::Error) -> Self {
        MemoWriteError::Storage(e.to_string())
    }
}

/// Result type alias for MemoWrite operations
pub type Result<T> = std::result::Result<T, MemoWriteError>;
