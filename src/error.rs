//! Error types for nl2sql-eval.
//!
//! Defines the main error enum used throughout the evaluation pipeline.
//! SQL execution failures are deliberately absent: they are data
//! (`ExecutionOutcome::ExecutionFailed`), not errors.

use thiserror::Error;

/// Main error type for evaluation operations.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Database-level errors outside query execution (opening the file, schema introspection).
    #[error("Database error: {0}")]
    Database(String),

    /// LLM transport errors (rate limits, auth, connection failures).
    #[error("LLM error: {0}")]
    Llm(String),

    /// The oracle answered, but not in the expected shape.
    #[error("Oracle protocol violation: {0}")]
    OracleProtocol(String),

    /// A call exceeded its per-call deadline.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Ground-truth dataset could not be read or parsed.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Accuracy was requested over zero examples.
    #[error("Cannot compute accuracy: the example set is empty")]
    EmptyDataset,

    /// Configuration errors (invalid config file, missing API key, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EvalError {
    /// Creates a database error with the given message.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates an oracle protocol violation with the given message.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::OracleProtocol(msg.into())
    }

    /// Creates a timeout error with the given message.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Creates a dataset error with the given message.
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true for errors that only affect the record being processed.
    ///
    /// Transport failures, timeouts and protocol violations are isolated to a
    /// single record; everything else aborts the run.
    pub fn is_record_scoped(&self) -> bool {
        matches!(self, Self::Llm(_) | Self::Timeout(_) | Self::OracleProtocol(_))
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Database(_) => "Database Error",
            Self::Llm(_) => "LLM Error",
            Self::OracleProtocol(_) => "Protocol Error",
            Self::Timeout(_) => "Timeout",
            Self::Dataset(_) => "Dataset Error",
            Self::EmptyDataset => "Dataset Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using EvalError.
pub type Result<T> = std::result::Result<T, EvalError>;
