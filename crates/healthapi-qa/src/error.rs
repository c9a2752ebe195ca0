//! Error taxonomy for the QA orchestrator.
//!
//! Command failures are never errors here: the executor turns launch
//! failures and timeouts into failed `ExecutionResult`s. `QaError` covers
//! the infrastructure around a category (preparing fixtures, talking to HTTP
//! collaborators). Report files are written through `anyhow` in `report`.

/// Orchestrator errors.
#[derive(Debug, thiserror::Error)]
pub enum QaError {
    #[error("command for {name} is empty")]
    EmptyCommand { name: String },

    #[error("category preparation failed for {category}: {reason}")]
    Preparation { category: String, reason: String },

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, QaError>;
