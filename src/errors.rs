//! Unified application error type.
//! Store, dispatcher, orchestrator and CLI all return AppError so a storage
//! fault can never be mistaken for an empty queue.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Queue store
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Queue store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid timestamp in store: {0}")]
    InvalidTimestamp(String),

    // ---------------------------
    // Sync
    // ---------------------------
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigLoad(#[from] serde_yaml::Error),

    #[error("Failed to save configuration")]
    ConfigSave,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

/// Outcome of a failed dispatch.
///
/// `Transport` and `Rejected` consume a retry attempt, whatever the status
/// code. The other two variants mean the queued row no longer matches the
/// dispatch table and are raised to the caller instead of being retried.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("server rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("unknown action type '{0}'")]
    UnknownActionType(String),

    #[error("payload for '{action_type}' does not decode: {reason}")]
    InvalidPayload { action_type: String, reason: String },
}

impl DispatchError {
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            DispatchError::UnknownActionType(_) | DispatchError::InvalidPayload { .. }
        )
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(e: reqwest::Error) -> Self {
        DispatchError::Transport(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
