//! GitHub Actions workflow-command annotations.
//!
//! The orchestration UI reads `::error::`, `::warning::` and `::notice::`
//! lines from a step's stdout. These are the only user-facing severities a
//! step reports; structured `tracing` logs sit alongside them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Annotation severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationLevel {
    Error,
    Warning,
    Notice,
}

impl AnnotationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationLevel::Error => "error",
            AnnotationLevel::Warning => "warning",
            AnnotationLevel::Notice => "notice",
        }
    }
}

impl fmt::Display for AnnotationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One workflow-command annotation line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub level: AnnotationLevel,
    pub title: Option<String>,
    pub message: String,
}

impl Annotation {
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(AnnotationLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(AnnotationLevel::Warning, message)
    }

    pub fn notice(message: impl Into<String>) -> Self {
        Self::new(AnnotationLevel::Notice, message)
    }

    fn new(level: AnnotationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            title: None,
            message: message.into(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Print the annotation to stdout for the runner to pick up.
    pub fn emit(&self) {
        println!("{}", self);
    }
}

fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.title {
            Some(title) => write!(
                f,
                "::{} title={}::{}",
                self.level,
                escape_property(title),
                escape_data(&self.message)
            ),
            None => write!(f, "::{}::{}", self.level, escape_data(&self.message)),
        }
    }
}
