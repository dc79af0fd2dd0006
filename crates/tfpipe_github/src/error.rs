//! Error types for the GitHub module.

use thiserror::Error;

/// Result type alias for GitHub operations.
pub type GithubResult<T> = Result<T, GithubError>;

/// Errors that can occur while talking to GitHub.
#[derive(Error, Debug)]
pub enum GithubError {
    #[error("GitHub CLI authentication failed: {message}. {hint}")]
    Authentication { message: String, hint: String },

    #[error("gh {command} failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Unexpected gh output: {0}")]
    UnexpectedOutput(String),

    #[error("Runner error: {0}")]
    Runner(#[from] tfpipe_runner::RunnerError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<GithubError> for tfpipe_core::CoreError {
    fn from(err: GithubError) -> Self {
        tfpipe_core::CoreError::Tracker(err.to_string())
    }
}
