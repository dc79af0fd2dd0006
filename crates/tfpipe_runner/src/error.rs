//! Error types for the runner module.

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur while running an external command.
///
/// A non-zero exit status is not an error at this layer; it is reported in
/// [`crate::ExecutionResult::exit_code`] and interpreted by the caller.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The program is not installed or not on `PATH`.
    #[error("Program not available: {0} was not found on PATH")]
    ProgramNotAvailable(String),

    #[error("Failed to spawn {program}: {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Command timeout after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
