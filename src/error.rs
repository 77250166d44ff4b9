use thiserror::Error;

use crate::engine::Phase;

#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Query or update against the account store failed.
    #[error("Repository error: {0}")]
    Repository(String),

    /// A message could not be handed to the delivery backend.
    #[error("Notification to {recipient} failed: {reason}")]
    Notification { recipient: String, reason: String },

    #[error("Ownership check failed: {0}")]
    OwnershipCheck(String),

    #[error("Account erase failed: {0}")]
    Eraser(String),

    /// Last-run state unreadable or unwritable. The cycle must not start.
    #[error("Run state error: {0}")]
    RunState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// A phase stopped before write-back; later phases were not run.
    #[error("Phase '{phase}' aborted: {source}")]
    PhaseAborted {
        phase: Phase,
        #[source]
        source: Box<LifecycleError>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Raw database errors from rusqlite
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Date parse errors from chrono
    #[error("Date parse error: {0}")]
    DateParse(#[from] chrono::ParseError),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
