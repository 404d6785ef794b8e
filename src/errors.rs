// src/errors.rs

//! Crate-wide error types and aliases.
//!
//! - [`SagaflowError`] covers configuration, IO and wiring failures of the
//!   engine itself.
//! - [`WorkflowError`] is what a workflow program observes at a suspension
//!   point, and what a `Failed` outcome carries.
//! - [`OperationError`] is returned by external operations.

use thiserror::Error;

use crate::engine::TaskId;

#[derive(Error, Debug)]
pub enum SagaflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Runtime channel closed: {0}")]
    ChannelClosed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure raised inside a workflow program.
///
/// Failures are delivered at the suspension point that caused them, so a
/// program can recover locally with a `match` or propagate with `?`.
/// Propagating out of `Workflow::resume` marks the instance `Failed`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("operation '{operation}' failed: {message}")]
    OperationFailure { operation: String, message: String },

    #[error("joined {task} failed: {message}")]
    JoinFailure { task: TaskId, message: String },

    /// The joined instance was cancelled. Never used as the terminal status
    /// of the cancelled instance itself.
    #[error("{task} was cancelled")]
    CancellationAbort { task: TaskId },

    #[error("invalid effect: {0}")]
    InvalidEffect(String),

    #[error("workflow exceeded {limit} steps without suspending")]
    StepLimitExceeded { limit: usize },

    /// Raised by workflow authors for their own failure conditions.
    #[error("{0}")]
    Program(String),
}

/// Error returned by an external asynchronous operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("no operation registered under '{0}'")]
    Unknown(String),

    #[error("{0}")]
    Rejected(String),
}

impl From<reqwest::Error> for OperationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            OperationError::Decode(err.to_string())
        } else {
            OperationError::Request(err.to_string())
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SagaflowError>;
