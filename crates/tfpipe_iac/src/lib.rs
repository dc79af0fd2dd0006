//! # tfpipe_iac
//!
//! Terraform and Azure CLI invocation for tfpipe.
//!
//! This crate turns pipeline steps into `terraform` and `az` command lines,
//! runs them through a [`tfpipe_runner::CommandRunner`], and hands the raw
//! exit code back. Interpretation happens in `tfpipe_core`.
//!
//! ## Features
//!
//! - Terraform init, validate, fmt, plan, apply, destroy and show
//! - Azure blob state backend configuration
//! - Azure CLI login verification
//! - Plan summary extraction for comments and issues
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use tfpipe_core::PlanOutcome;
//! use tfpipe_iac::{PlanOptions, TerraformRunner};
//! use tfpipe_runner::{ProcessRunner, ProcessRunnerOptions};
//!
//! # async fn run() -> tfpipe_iac::IacResult<()> {
//! let runner = Arc::new(ProcessRunner::new(ProcessRunnerOptions::default()));
//! let terraform = TerraformRunner::new(runner);
//!
//! let result = terraform
//!     .plan(Path::new("infra"), &PlanOptions::new("prod", "parameters/prod-variables.tfvars"))
//!     .await?;
//! let outcome = PlanOutcome::from_exit_code(result.exit_code);
//! # Ok(())
//! # }
//! ```

pub mod azure;
pub mod backend;
pub mod error;
pub mod plan_summary;
pub mod terraform;

pub use azure::{AzureAccount, AzureCli};
pub use backend::AzureBlobBackend;
pub use error::{IacError, IacResult};
pub use plan_summary::PlanSummary;
pub use terraform::{
    has_terraform_files, PlanOptions, TerraformResult, TerraformRunner,
    TerraformValidator, ValidationCheck, ValidationReport,
};
