//! Error types for IaC module.

use thiserror::Error;

/// Result type alias for IaC operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur during IaC operations.
#[derive(Error, Debug)]
pub enum IacError {
    #[error("Terraform not available: {0}")]
    TerraformNotAvailable(String),

    #[error("Terraform {command} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        message: String,
    },

    #[error("{tool} authentication failed: {message}. {hint}")]
    Authentication {
        tool: String,
        message: String,
        hint: String,
    },

    #[error("Unexpected {tool} output: {message}")]
    UnexpectedOutput { tool: String, message: String },

    #[error("Runner error: {0}")]
    Runner(#[from] tfpipe_runner::RunnerError),

    #[error(transparent)]
    Core(#[from] tfpipe_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
