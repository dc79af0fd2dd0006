//! CLI command definitions.
//!
//! Each subcommand is one pipeline step: it validates its own inputs, runs
//! the wrapped tool and reports through annotations and step outputs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use tfpipe_core::{PipelineConfig, PlanOutcome, RunContext, StepOutputs, StepSummary, Validator};
use tfpipe_github::GhCli;
use tfpipe_iac::TerraformRunner;
use tfpipe_runner::{CommandRunner, ProcessRunner, ProcessRunnerOptions};

pub mod apply;
pub mod approval;
pub mod comment;
pub mod destroy;
pub mod download;
pub mod drift;
pub mod fmt;
pub mod init;
pub mod plan;
pub mod publish;
pub mod summary;
pub mod validate;
pub mod validate_inputs;

/// tfpipe - Terraform pipeline steps for GitHub Actions
#[derive(Parser)]
#[command(name = "tfpipe")]
#[command(version, about = "tfpipe - Terraform pipeline steps for GitHub Actions")]
#[command(long_about = r#"
tfpipe runs the steps of a Terraform CI/CD pipeline: it validates inputs,
drives terraform, az and gh, interprets exit codes and reports back through
workflow annotations and step outputs.

STEPS:
  validate-inputs → Check environment name, paths and identifiers
  init            → terraform init against the state backend
  validate        → fmt check, init without backend, terraform validate
  fmt             → Check or rewrite Terraform formatting
  plan            → terraform plan -detailed-exitcode (output: exitcode)
  apply           → Apply a saved plan, optionally from the plan artifact
  destroy         → Destroy an environment
  publish         → Store the plan file as tfplan-<env>-<run id>
  download        → Restore tfplan-<env>-<run id>
  approval        → Open the approval issue when the plan has changes
  drift           → Open or close the drift issue for an environment
  comment         → Post the plan on a pull request
  summary         → Render the deployment summary (output: summary)

EXIT CODES:
  0 - Success
  1 - Failure (validation, Terraform, authentication, artifact)
  2 - Changes present (plan --detailed-exitcode only)
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every step.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to ./tfpipe.yaml when present)
    #[arg(short, long, global = true, env = "TFPIPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log external commands instead of running them
    #[arg(long, global = true, env = "TFPIPE_DRY_RUN")]
    pub dry_run: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "TFPIPE_LOG_JSON")]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate step inputs without running any tool
    #[command(name = "validate-inputs")]
    ValidateInputs(validate_inputs::ValidateInputsArgs),

    /// Initialise Terraform against the state backend
    Init(init::InitArgs),

    /// Check formatting and validate the configuration
    Validate(validate::ValidateArgs),

    /// Check or rewrite Terraform formatting
    Fmt(fmt::FmtArgs),

    /// Plan an environment
    Plan(plan::PlanArgs),

    /// Apply a saved plan
    Apply(apply::ApplyArgs),

    /// Destroy an environment
    Destroy(destroy::DestroyArgs),

    /// Publish the plan file as a run artifact
    Publish(publish::PublishArgs),

    /// Download the plan artifact of a run
    Download(download::DownloadArgs),

    /// Request approval for pending changes
    Approval(approval::ApprovalArgs),

    /// Report drift for an environment
    Drift(drift::DriftArgs),

    /// Comment the plan on a pull request
    Comment(comment::CommentArgs),

    /// Render the deployment summary
    Summary(summary::SummaryArgs),
}

impl Commands {
    /// Subcommand name, used as annotation title.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::ValidateInputs(_) => "validate-inputs",
            Commands::Init(_) => "init",
            Commands::Validate(_) => "validate",
            Commands::Fmt(_) => "fmt",
            Commands::Plan(_) => "plan",
            Commands::Apply(_) => "apply",
            Commands::Destroy(_) => "destroy",
            Commands::Publish(_) => "publish",
            Commands::Download(_) => "download",
            Commands::Approval(_) => "approval",
            Commands::Drift(_) => "drift",
            Commands::Comment(_) => "comment",
            Commands::Summary(_) => "summary",
        }
    }
}

/// Environment and Terraform directory a step targets.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Target environment (e.g. dev, staging, prod)
    #[arg(short, long, env = "TFPIPE_ENVIRONMENT")]
    pub environment: String,

    /// Terraform working directory (defaults to the configured one)
    #[arg(short = 'd', long, env = "TFPIPE_WORKING_DIRECTORY")]
    pub working_directory: Option<PathBuf>,
}

/// Run identifier used in artifact names and issue titles.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// CI run id
    #[arg(long, env = "GITHUB_RUN_ID")]
    pub run_id: String,
}

/// Repository and credentials for `gh`.
#[derive(Args, Debug, Clone, Default)]
pub struct GithubArgs {
    /// Repository as owner/name (defaults to the checkout)
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repo: Option<String>,

    /// Token for the GitHub CLI
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Skip the `gh auth status` check
    #[arg(long)]
    pub skip_auth_check: bool,
}

/// Exit code of the plan step a later step acts on.
#[derive(Args, Debug, Clone)]
pub struct PlanResultArgs {
    /// Plan exit code (0 no changes, 2 changes, 1 error)
    #[arg(long = "exitcode", env = "TFPIPE_PLAN_EXITCODE", allow_negative_numbers = true)]
    pub exit_code: i32,
}

impl PlanResultArgs {
    pub fn outcome(&self) -> PlanOutcome {
        PlanOutcome::from_exit_code(self.exit_code)
    }
}

/// Everything a step needs besides its own arguments.
pub struct Session {
    pub config: PipelineConfig,
    pub runner: Arc<dyn CommandRunner>,
    pub ctx: RunContext,
    pub outputs: StepOutputs,
    pub step_summary: StepSummary,
    pub dry_run: bool,
}

impl Session {
    pub fn from_globals(global: &GlobalArgs) -> Result<Self> {
        let config = PipelineConfig::discover(global.config.as_deref())
            .context("Failed to load tfpipe configuration")?;

        let mut options = ProcessRunnerOptions::default();
        if global.dry_run {
            options = options.dry_run();
        }

        Ok(Self {
            config,
            runner: Arc::new(ProcessRunner::new(options)),
            ctx: RunContext::from_env(),
            outputs: StepOutputs::from_env(),
            step_summary: StepSummary::from_env(),
            dry_run: global.dry_run,
        })
    }

    pub fn terraform(&self) -> TerraformRunner {
        TerraformRunner::new(self.runner.clone()).with_timeout(self.config.terraform_timeout_seconds)
    }

    pub fn gh(&self, args: &GithubArgs) -> GhCli {
        let mut gh = GhCli::new(self.runner.clone());
        if let Some(repo) = args.repo.as_deref().filter(|r| !r.is_empty()) {
            gh = gh.with_repo(repo);
        }
        if let Some(token) = args.token.as_deref().filter(|t| !t.is_empty()) {
            gh = gh.with_token(token);
        }
        gh
    }

    /// Run context with the run id taken from the command line.
    pub fn ctx_for_run(&self, run: &RunArgs) -> RunContext {
        self.ctx.clone().with_run_id(run.run_id.trim())
    }

    pub fn working_dir(&self, target: &TargetArgs) -> PathBuf {
        target
            .working_directory
            .clone()
            .unwrap_or_else(|| self.config.working_directory.clone())
    }

    /// Validate the target and return its environment and working directory.
    pub fn check_target(&self, target: &TargetArgs, v: &mut Validator) -> (String, PathBuf) {
        let dir = self.working_dir(target);
        v.environment(&target.environment)
            .directory("working-directory", &dir);
        (target.environment.clone(), dir)
    }

    pub fn labels(&self) -> Vec<String> {
        self.config.extra_labels.clone()
    }
}

/// Absolute form of `path`, for arguments read by a tool running elsewhere.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Cannot read current directory")?;
    debug!("Resolving {:?} against {:?}", path, cwd);
    Ok(cwd.join(path))
}

/// Read optional text passed either inline or as a file.
pub fn read_text(inline: Option<&str>, file: Option<&Path>) -> Result<Option<String>> {
    if let Some(text) = inline {
        return Ok(Some(text.to_string()));
    }
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map(Some)
            .with_context(|| format!("Cannot read {}", path.display())),
        None => Ok(None),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tfpipe_runner::MockRunner;

    /// Session over a mock runner with outputs captured under `dir`.
    pub fn session(mock: &MockRunner, dir: &Path) -> Session {
        let config = PipelineConfig {
            working_directory: dir.to_path_buf(),
            parameters_directory: dir.join("parameters"),
            artifact_directory: dir.join("artifacts"),
            ..PipelineConfig::default()
        };
        Session {
            config,
            runner: Arc::new(mock.clone()),
            ctx: RunContext::default()
                .with_run_id("12345")
                .with_actor("octocat")
                .with_ref("refs/heads/main"),
            outputs: StepOutputs::to_file(dir.join("github_output")),
            step_summary: StepSummary::to_file(dir.join("step_summary.md")),
            dry_run: false,
        }
    }

    pub fn outputs(dir: &Path) -> String {
        std::fs::read_to_string(dir.join("github_output")).unwrap_or_default()
    }

    pub fn target(environment: &str, dir: &Path) -> TargetArgs {
        TargetArgs {
            environment: environment.to_string(),
            working_directory: Some(dir.to_path_buf()),
        }
    }
}
