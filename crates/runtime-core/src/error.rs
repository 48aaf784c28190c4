//! Error types for the elastic execution runtime

use thiserror::Error;

/// Result type alias using the runtime Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the elastic execution runtime
#[derive(Error, Debug)]
pub enum Error {
    // Programming errors
    #[error("Operation not implemented: {operation}")]
    NotImplemented { operation: String },

    #[error("Unknown tracked attribute: {name}")]
    UnknownAttribute { name: String },

    // Recoverable execution faults
    #[error("Worker failure: {message}")]
    WorkerFailure { message: String },

    // Membership control signal
    #[error("Cluster membership changed")]
    MembershipChanged,

    // Reset errors
    #[error("Reset callback failed: {message}")]
    ResetCallbackFailed { message: String },

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Recovery action the run loop takes for a failed computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Restore the last committed state, reset, and retry
    Restore,

    /// Reset and retry without restoring (state is not corrupted)
    Resync,

    /// Not recoverable; propagate to the caller
    Fatal,
}

impl Error {
    /// Classify this error into the recovery action the run loop should take
    pub fn recovery(&self) -> Recovery {
        match self {
            Error::WorkerFailure { .. } => Recovery::Restore,
            Error::MembershipChanged => Recovery::Resync,
            _ => Recovery::Fatal,
        }
    }

    /// Returns true if the run loop can recover from this error
    pub fn is_recoverable(&self) -> bool {
        self.recovery() != Recovery::Fatal
    }

    /// Convenience constructor for worker failures
    pub fn worker_failure(message: impl Into<String>) -> Self {
        Error::WorkerFailure {
            message: message.into(),
        }
    }

    /// Convenience constructor for unimplemented state operations
    pub fn not_implemented(operation: &str) -> Self {
        Error::NotImplemented {
            operation: operation.to_string(),
        }
    }
}
