//! Terraform exit-code interpretation.
//!
//! `terraform plan -detailed-exitcode` reports three classes: 0 for no
//! changes, 2 for a successful plan with changes, 1 for an error. Exit code 2
//! is a success. Every consumer of a plan result (approval branch, apply
//! branch, drift reporter) goes through [`PlanOutcome`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::annotation::Annotation;

/// Classified result of a plan-type operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum PlanOutcome {
    /// Exit code 0.
    NoChanges,
    /// Exit code 2.
    Changes,
    /// Exit code 1.
    Error,
    /// Any other exit code, including signals reported as -1.
    Unexpected(i32),
}

impl PlanOutcome {
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => PlanOutcome::NoChanges,
            2 => PlanOutcome::Changes,
            1 => PlanOutcome::Error,
            other => PlanOutcome::Unexpected(other),
        }
    }

    /// The exit code this outcome was built from.
    pub fn exit_code(&self) -> i32 {
        match self {
            PlanOutcome::NoChanges => 0,
            PlanOutcome::Changes => 2,
            PlanOutcome::Error => 1,
            PlanOutcome::Unexpected(code) => *code,
        }
    }

    /// Plan completed, with or without changes.
    pub fn is_success(&self) -> bool {
        matches!(self, PlanOutcome::NoChanges | PlanOutcome::Changes)
    }

    pub fn has_changes(&self) -> bool {
        matches!(self, PlanOutcome::Changes)
    }

    pub fn requires_approval(&self) -> bool {
        self.has_changes()
    }

    pub fn allows_apply(&self) -> bool {
        self.has_changes()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanOutcome::NoChanges => "no-changes",
            PlanOutcome::Changes => "changes",
            PlanOutcome::Error => "error",
            PlanOutcome::Unexpected(_) => "unexpected",
        }
    }

    /// The annotation a step reports for this outcome.
    pub fn annotation(&self, environment: &str) -> Annotation {
        match self {
            PlanOutcome::NoChanges => Annotation::notice(format!(
                "No changes detected for environment '{}'",
                environment
            )),
            PlanOutcome::Changes => Annotation::warning(format!(
                "Changes detected for environment '{}'; review the plan before applying",
                environment
            ))
            .with_title("Terraform changes pending"),
            PlanOutcome::Error => Annotation::error(format!(
                "Terraform plan failed for environment '{}'",
                environment
            ))
            .with_title("Terraform error"),
            PlanOutcome::Unexpected(code) => Annotation::error(format!(
                "Terraform exited with unexpected code {} for environment '{}'",
                code, environment
            ))
            .with_title("Unexpected Terraform exit code"),
        }
    }
}

impl fmt::Display for PlanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanOutcome::Unexpected(code) => write!(f, "unexpected ({})", code),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationLevel;

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(PlanOutcome::from_exit_code(0), PlanOutcome::NoChanges);
        assert_eq!(PlanOutcome::from_exit_code(1), PlanOutcome::Error);
        assert_eq!(PlanOutcome::from_exit_code(2), PlanOutcome::Changes);
        assert_eq!(PlanOutcome::from_exit_code(3), PlanOutcome::Unexpected(3));
        assert_eq!(PlanOutcome::from_exit_code(-1), PlanOutcome::Unexpected(-1));
    }

    #[test]
    fn test_changes_is_success_not_error() {
        let outcome = PlanOutcome::from_exit_code(2);
        assert!(outcome.is_success());
        assert!(outcome.allows_apply());
        assert!(outcome.requires_approval());
        assert_ne!(outcome, PlanOutcome::Error);
    }

    #[test]
    fn test_error_never_allows_apply() {
        for code in [1, 3, 127, -1] {
            let outcome = PlanOutcome::from_exit_code(code);
            assert!(!outcome.is_success());
            assert!(!outcome.allows_apply());
            assert!(!outcome.requires_approval());
        }
    }

    #[test]
    fn test_no_changes_needs_nothing() {
        let outcome = PlanOutcome::NoChanges;
        assert!(outcome.is_success());
        assert!(!outcome.allows_apply());
        assert!(!outcome.requires_approval());
    }

    #[test]
    fn test_exit_code_round_trip() {
        for code in [0, 1, 2, 42] {
            assert_eq!(PlanOutcome::from_exit_code(code).exit_code(), code);
        }
    }

    #[test]
    fn test_annotations_distinguish_error_classes() {
        assert_eq!(PlanOutcome::NoChanges.annotation("dev").level, AnnotationLevel::Notice);
        assert_eq!(PlanOutcome::Changes.annotation("dev").level, AnnotationLevel::Warning);

        let error = PlanOutcome::Error.annotation("dev");
        let unexpected = PlanOutcome::Unexpected(137).annotation("dev");
        assert_eq!(error.level, AnnotationLevel::Error);
        assert_eq!(unexpected.level, AnnotationLevel::Error);
        assert_ne!(error.title, unexpected.title);
        assert!(unexpected.message.contains("137"));
    }
}
