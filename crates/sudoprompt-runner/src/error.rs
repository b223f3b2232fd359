//! Error types for process execution

use thiserror::Error;

/// Failures of the process plumbing itself, before any elevation semantics apply.
///
/// Strategies translate these into [`ElevationError`](sudoprompt_utils::error::ElevationError)
/// outcomes; they never reach callers directly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunnerError {
    #[error("Failed to spawn process '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Native execution failed: {reason}")]
    NativeExecutionFailed { reason: String },

    #[error("Process output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },
}
