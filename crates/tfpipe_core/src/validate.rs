//! Input validation for pipeline steps.
//!
//! Every step checks its own inputs with a [`Validator`] before any external
//! tool runs. Errors accumulate so one run reports every bad input at once.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENVIRONMENT_PATTERN: &str = r"^[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]$|^[a-zA-Z0-9]$";
const STORAGE_ACCOUNT_PATTERN: &str = r"^[a-z0-9]{3,24}$";

fn environment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ENVIRONMENT_PATTERN).expect("environment pattern compiles"))
}

fn storage_account_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(STORAGE_ACCOUNT_PATTERN).expect("storage pattern compiles"))
}

/// Whether `name` is an acceptable environment name.
pub fn is_valid_environment(name: &str) -> bool {
    environment_regex().is_match(name)
}

/// Whether `name` is an acceptable Azure storage account name.
pub fn is_valid_storage_account(name: &str) -> bool {
    storage_account_regex().is_match(name)
}

/// A single rejected input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Name of the offending input
    pub input: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid input '{}': {}", self.input, self.message)
    }
}

/// All inputs rejected by one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Input validation failed: {}", join(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Accumulating input checker.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    fn reject(&mut self, input: &str, message: String) -> &mut Self {
        self.errors.push(ValidationError::new(input, message));
        self
    }

    /// Require a non-blank value.
    pub fn non_empty(&mut self, input: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            return self.reject(input, format!("'{}' is required and must not be empty", input));
        }
        self
    }

    /// Check an environment name (input `environment`).
    pub fn environment(&mut self, name: &str) -> &mut Self {
        if name.trim().is_empty() {
            return self.reject("environment", "environment name is required".to_string());
        }
        if !is_valid_environment(name) {
            return self.reject(
                "environment",
                format!(
                    "environment name '{}' must contain only letters, digits and hyphens, \
                     and must start and end with a letter or digit",
                    name
                ),
            );
        }
        self
    }

    /// Check an Azure storage account name.
    pub fn storage_account(&mut self, input: &str, name: &str) -> &mut Self {
        if !is_valid_storage_account(name) {
            return self.reject(
                input,
                format!(
                    "storage account name '{}' must be 3-24 lowercase letters or digits",
                    name
                ),
            );
        }
        self
    }

    /// Check a CI run identifier.
    pub fn run_id(&mut self, input: &str, id: &str) -> &mut Self {
        if id.trim().is_empty() {
            return self.reject(input, format!("'{}' is required and must not be empty", input));
        }
        if !id.chars().all(|c| c.is_ascii_digit()) {
            return self.reject(input, format!("run id '{}' must be numeric", id));
        }
        self
    }

    /// Require an existing directory.
    pub fn directory(&mut self, input: &str, path: &Path) -> &mut Self {
        if !path.is_dir() {
            return self.reject(input, format!("Directory '{}' does not exist", path.display()));
        }
        self
    }

    /// Require an existing regular file.
    pub fn file(&mut self, input: &str, path: &Path) -> &mut Self {
        if !path.is_file() {
            return self.reject(input, format!("File '{}' does not exist", path.display()));
        }
        self
    }

    /// Reject `input` with `message` unless `ok` holds.
    pub fn require(&mut self, input: &str, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            return self.reject(input, message.into());
        }
        self
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Finish the pass, returning every rejected input.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(self.errors))
        }
    }
}
