//! Error types for stepchain operations.
//!
//! This module defines [`StepchainError`], the primary error type used
//! throughout the crate, a [`Result`] type alias, and the [`require`]
//! precondition guard.
//!
//! # Error Handling Strategy
//!
//! - Use `StepchainError` for domain-specific errors that need distinct handling
//! - Use `anyhow::Error` (via `StepchainError::Other`) for errors raised inside
//!   step logic that the chain merely propagates
//! - All errors are fatal to the triggering call; nothing is retried or
//!   suppressed internally

use thiserror::Error;

/// Core error type for stepchain operations.
#[derive(Debug, Error)]
pub enum StepchainError {
    /// Chain mutation attempted while executing or after freezing.
    #[error("Chain '{chain}' cannot be modified: {reason}")]
    InvalidState { chain: String, reason: String },

    /// A step name or graph node key collides with an existing entry.
    #[error("Key '{key}' is already registered")]
    DuplicateKey { key: String },

    /// A graph lookup for a node key that does not exist.
    #[error("Node '{key}' not found")]
    NodeNotFound { key: String },

    /// A step declares a mandatory dependency on an unregistered step.
    #[error("Step '{step}' requires '{dependency}', which is not registered")]
    MissingDependency { step: String, dependency: String },

    /// Step dependency cycle detected.
    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// A second execution attempted while one is already in flight.
    #[error("Chain '{chain}' is already executing")]
    AlreadyExecuting { chain: String },

    /// Step execution failed.
    #[error("Step '{step}' failed: {message}")]
    StepExecutionError { step: String, message: String },

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for stepchain operations.
pub type Result<T> = std::result::Result<T, StepchainError>;

/// Fail with the given error when a precondition does not hold.
///
/// The error is constructed lazily, so callers pay nothing on the
/// success path.
pub fn require(condition: bool, error: impl FnOnce() -> StepchainError) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(error())
    }
}
