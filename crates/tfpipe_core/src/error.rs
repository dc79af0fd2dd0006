//! Error types for the core module.

use std::path::PathBuf;

use thiserror::Error;

use crate::validate::ValidationErrors;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur during core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("Issue tracker error: {0}")]
    Tracker(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while moving plan artifacts between jobs.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Plan file '{0}' does not exist; the plan step must run before publish")]
    PlanFileMissing(PathBuf),

    #[error("Artifact '{0}' not found; the plan and publish steps must run earlier in this pipeline")]
    NotFound(String),

    #[error("Artifact '{name}' is corrupt: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("Artifact IO error: {0}")]
    Io(#[from] std::io::Error),
}
