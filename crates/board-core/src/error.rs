//! Error types for `board-core`.
//!
//! The five store kinds (`FetchFailed`, `UpdateRejected`, `IssueNotFound`,
//! `NothingToUndo`, `UndoReversionFailed`) are always recovered inside the
//! store; they surface to callers as values, never as panics.

use std::time::Duration;
use thiserror::Error;

/// Primary error type for board operations.
#[derive(Error, Debug)]
pub enum BoardError {
    // === Store Errors ===
    /// The Issue Service could not deliver the issue set.
    #[error("Failed to fetch issues: {reason}")]
    FetchFailed { reason: String },

    /// The Issue Service rejected an update; the optimistic change was rolled back.
    #[error("Update of {id} rejected: {reason}")]
    UpdateRejected { id: String, reason: String },

    /// Issue with the specified ID was not found.
    #[error("Issue not found: {id}")]
    IssueNotFound { id: String },

    /// Undo was requested with no open undo window.
    #[error("Nothing to undo")]
    NothingToUndo,

    /// The local undo succeeded but the service could not be told about it.
    #[error("Failed to revert {id} on the backend: {reason}")]
    UndoReversionFailed { id: String, reason: String },

    // === Backend Errors ===
    /// The (simulated) remote service failed.
    #[error("Backend error: {0}")]
    Backend(String),

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors occurred.
    #[error("Validation errors: {errors:?}")]
    ValidationErrors { errors: Vec<ValidationError> },

    /// Invalid status value.
    #[error("Invalid status: {status}")]
    InvalidStatus { status: String },

    /// Invalid priority label.
    #[error("Invalid priority: {priority}")]
    InvalidPriority { priority: String },

    /// Polling interval outside the accepted range.
    #[error("Polling interval must be {min:?}..={max:?}, got {got:?}")]
    InvalidPollingInterval {
        got: Duration,
        min: Duration,
        max: Duration,
    },

    // === Configuration Errors ===
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === Storage Errors ===
    /// Snapshot storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Classification of the recoverable store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FetchFailed,
    UpdateRejected,
    IssueNotFound,
    NothingToUndo,
    UndoReversionFailed,
}

/// A single field validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl BoardError {
    #[must_use]
    pub fn from_validation_errors(errors: Vec<ValidationError>) -> Self {
        if errors.len() == 1 {
            let err = &errors[0];
            Self::Validation {
                field: err.field.clone(),
                reason: err.message.clone(),
            }
        } else {
            Self::ValidationErrors { errors }
        }
    }

    /// The store classification of this error, if it is one of the store kinds.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::FetchFailed { .. } => Some(ErrorKind::FetchFailed),
            Self::UpdateRejected { .. } => Some(ErrorKind::UpdateRejected),
            Self::IssueNotFound { .. } => Some(ErrorKind::IssueNotFound),
            Self::NothingToUndo => Some(ErrorKind::NothingToUndo),
            Self::UndoReversionFailed { .. } => Some(ErrorKind::UndoReversionFailed),
            _ => None,
        }
    }
}

/// Result type using `BoardError`.
pub type Result<T> = std::result::Result<T, BoardError>;
