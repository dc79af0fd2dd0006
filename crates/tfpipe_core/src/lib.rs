//! # tfpipe_core
//!
//! The decision logic of the tfpipe Terraform pipeline.
//!
//! Nothing in this crate spawns a process. It validates step inputs,
//! interprets Terraform's three-way exit code, names and moves plan
//! artifacts, and drives the approval and drift issues through the
//! [`IssueTracker`] capability.
//!
//! ## Example
//!
//! ```rust
//! use tfpipe_core::{ArtifactName, PlanOutcome, Validator};
//!
//! let mut v = Validator::new();
//! v.environment("prod");
//! assert!(v.finish().is_ok());
//!
//! let outcome = PlanOutcome::from_exit_code(2);
//! assert!(outcome.requires_approval());
//! assert_eq!(ArtifactName::for_plan("prod", "12345").as_str(), "tfplan-prod-12345");
//! ```

pub mod annotation;
pub mod approval;
pub mod artifact;
pub mod backend;
pub mod config;
pub mod context;
pub mod drift;
pub mod error;
pub mod output;
pub mod outcome;
pub mod summary;
pub mod tracker;
pub mod validate;

pub use annotation::{Annotation, AnnotationLevel};
pub use approval::{ApprovalGate, APPROVAL_LABEL, APPROVE_COMMAND};
pub use artifact::{
    plan_file_name, var_file_name, ArtifactHandle, ArtifactManifest, ArtifactName, ArtifactStore,
    DirectoryArtifactStore, RETENTION_DAYS,
};
pub use backend::{LocalBackend, StateBackend};
pub use config::{BackendSettings, PipelineConfig};
pub use context::RunContext;
pub use drift::{DriftAction, DriftReporter, DRIFT_LABEL};
pub use error::{ArtifactError, CoreError, CoreResult};
pub use output::{StepOutputs, StepSummary};
pub use outcome::PlanOutcome;
pub use summary::{PipelineSummary, StageResult, StageStatus};
pub use tracker::{InMemoryIssueTracker, Issue, IssueTracker, NewIssue, TERRAFORM_LABEL};
pub use validate::{ValidationError, ValidationErrors, Validator};
