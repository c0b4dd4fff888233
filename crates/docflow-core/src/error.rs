//! Core error type for docflow.
//!
//! `DocflowError` is used throughout the core domain (stores, workflow,
//! configuration). Every variant carries a human-readable message that the
//! CLI prints verbatim when an operation is rejected.

#[derive(Debug, thiserror::Error)]
pub enum DocflowError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for DocflowError {
    fn from(e: rusqlite::Error) -> Self {
        DocflowError::Database(e.to_string())
    }
}

impl DocflowError {
    /// Whether the caller can fix the request (as opposed to a storage fault).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Validation(_) | Self::Conflict(_) | Self::InvalidTransition(_)
        )
    }
}
