//! Terraform invoker.
//!
//! Each method changes into the working directory, runs one Terraform
//! subcommand with a fixed non-interactive flag set, and returns the exit
//! code untouched. Retries and state locking stay inside Terraform.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use tfpipe_core::{plan_file_name, StateBackend};
use tfpipe_runner::{last_output_line, CommandConfig, CommandRunner, RunConfig, RunnerError};

use crate::error::{IacError, IacResult};

/// Environment every Terraform invocation runs with.
pub const TERRAFORM_ENV: [(&str, &str); 3] = [
    ("TF_IN_AUTOMATION", "true"),
    ("TF_INPUT", "0"),
    ("ARM_USE_CLI", "true"),
];

const TERRAFORM_BINARY: &str = "terraform";

/// Result of a Terraform operation.
#[derive(Debug, Clone)]
pub struct TerraformResult {
    pub command: String,
    pub exit_code: i32,
    pub output: String,
}

impl TerraformResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last meaningful line of output; Terraform prints its error there.
    pub fn last_line(&self) -> &str {
        last_output_line(&self.output).unwrap_or("no output")
    }

    /// Turn a non-zero exit into [`IacError::CommandFailed`].
    ///
    /// Not for plan results, where exit code 2 is a success.
    pub fn into_checked(self) -> IacResult<Self> {
        if self.success() {
            return Ok(self);
        }
        let message = self.last_line().to_string();
        Err(IacError::CommandFailed {
            command: self.command,
            exit_code: self.exit_code,
            message,
        })
    }
}

/// Options for `terraform plan`.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub environment: String,
    pub var_file: PathBuf,
    /// Plan a destroy instead of an update
    pub destroy: bool,
    /// Plan output file; defaults to `{environment}.plan.tfplan`
    pub out: Option<PathBuf>,
}

impl PlanOptions {
    pub fn new(environment: impl Into<String>, var_file: impl Into<PathBuf>) -> Self {
        Self {
            environment: environment.into(),
            var_file: var_file.into(),
            destroy: false,
            out: None,
        }
    }

    pub fn destroy(mut self) -> Self {
        self.destroy = true;
        self
    }

    pub fn out(mut self, path: impl Into<PathBuf>) -> Self {
        self.out = Some(path.into());
        self
    }

    pub fn plan_file(&self) -> PathBuf {
        self.out
            .clone()
            .unwrap_or_else(|| PathBuf::from(plan_file_name(&self.environment)))
    }
}

/// Whether `dir` holds any `*.tf` file.
///
/// The directory part is escaped so names such as `env[prod]` are taken
/// literally.
pub fn has_terraform_files(dir: &Path) -> bool {
    let pattern = format!(
        "{}/*.tf",
        glob::Pattern::escape(&dir.to_string_lossy()).trim_end_matches('/')
    );
    match glob::glob(&pattern) {
        Ok(mut paths) => paths.any(|p| p.is_ok()),
        Err(e) => {
            warn!("Invalid glob pattern {:?}: {}", pattern, e);
            false
        }
    }
}

/// Terraform runner that executes commands on the host.
pub struct TerraformRunner {
    runner: Arc<dyn CommandRunner>,
    timeout_seconds: u64,
    stream_logs: bool,
}

impl TerraformRunner {
    /// Create a new Terraform runner.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            timeout_seconds: 0,
            stream_logs: true,
        }
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_stream_logs(mut self, enabled: bool) -> Self {
        self.stream_logs = enabled;
        self
    }

    /// Run terraform init against a state backend.
    pub async fn init(
        &self,
        working_dir: &Path,
        backend: &dyn StateBackend,
        reconfigure: bool,
    ) -> IacResult<TerraformResult> {
        info!("Running terraform init ({} backend) in {:?}", backend.kind(), working_dir);
        let mut args = vec!["init".to_string(), "-input=false".to_string(), "-no-color".to_string()];
        if reconfigure {
            args.push("-reconfigure".to_string());
        }
        args.extend(backend.init_args());
        self.run_command("init", working_dir, args).await
    }

    /// Run terraform init without configuring a backend.
    pub async fn init_without_backend(&self, working_dir: &Path) -> IacResult<TerraformResult> {
        info!("Running terraform init -backend=false in {:?}", working_dir);
        self.run_command("init", working_dir, ["init", "-input=false", "-no-color", "-backend=false"])
            .await
    }

    /// Run terraform validate.
    pub async fn validate(&self, working_dir: &Path) -> IacResult<TerraformResult> {
        info!("Running terraform validate in {:?}", working_dir);
        self.run_command("validate", working_dir, ["validate", "-no-color"]).await
    }

    /// Run terraform fmt check.
    pub async fn fmt_check(&self, working_dir: &Path) -> IacResult<TerraformResult> {
        info!("Running terraform fmt check in {:?}", working_dir);
        self.run_command("fmt", working_dir, ["fmt", "-check", "-recursive", "-diff", "-no-color"])
            .await
    }

    /// Run terraform fmt to format files.
    pub async fn fmt(&self, working_dir: &Path) -> IacResult<TerraformResult> {
        info!("Running terraform fmt in {:?}", working_dir);
        self.run_command("fmt", working_dir, ["fmt", "-recursive", "-no-color"]).await
    }

    /// Run terraform plan with `-detailed-exitcode`.
    pub async fn plan(&self, working_dir: &Path, options: &PlanOptions) -> IacResult<TerraformResult> {
        info!(
            "Running terraform plan{} for {} in {:?}",
            if options.destroy { " -destroy" } else { "" },
            options.environment,
            working_dir
        );
        let mut args = vec![
            "plan".to_string(),
            "-input=false".to_string(),
            "-no-color".to_string(),
            "-detailed-exitcode".to_string(),
            format!("-var-file={}", options.var_file.display()),
            format!("-out={}", options.plan_file().display()),
        ];
        if options.destroy {
            args.push("-destroy".to_string());
        }
        self.run_command("plan", working_dir, args).await
    }

    /// Apply a saved plan.
    pub async fn apply(&self, working_dir: &Path, plan_file: &Path) -> IacResult<TerraformResult> {
        info!("Running terraform apply of {:?} in {:?}", plan_file, working_dir);
        self.run_command(
            "apply",
            working_dir,
            vec![
                "apply".to_string(),
                "-input=false".to_string(),
                "-no-color".to_string(),
                "-auto-approve".to_string(),
                plan_file.display().to_string(),
            ],
        )
        .await
    }

    /// Destroy all resources tracked for an environment.
    pub async fn destroy(&self, working_dir: &Path, var_file: &Path) -> IacResult<TerraformResult> {
        info!("Running terraform destroy in {:?}", working_dir);
        self.run_command(
            "destroy",
            working_dir,
            vec![
                "destroy".to_string(),
                "-input=false".to_string(),
                "-no-color".to_string(),
                "-auto-approve".to_string(),
                format!("-var-file={}", var_file.display()),
            ],
        )
        .await
    }

    /// Render a saved plan as text.
    pub async fn show(&self, working_dir: &Path, plan_file: &Path) -> IacResult<TerraformResult> {
        debug!("Running terraform show of {:?}", plan_file);
        self.run_command_quiet(
            "show",
            working_dir,
            vec!["show".to_string(), "-no-color".to_string(), plan_file.display().to_string()],
        )
        .await
    }

    fn command_config<I, S>(&self, working_dir: &Path, args: I) -> CommandConfig
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TERRAFORM_ENV.iter().fold(
            CommandConfig::new(TERRAFORM_BINARY).args(args).workdir(working_dir),
            |config, (key, value)| config.env(*key, *value),
        )
    }

    async fn execute(
        &self,
        command: &str,
        config: CommandConfig,
        stream_logs: bool,
    ) -> IacResult<TerraformResult> {
        let run_config = RunConfig::default()
            .timeout(self.timeout_seconds)
            .stream_logs(stream_logs);

        debug!("Executing {}", config.display());
        let result = match self.runner.run(&config, &run_config).await {
            Ok(result) => result,
            Err(RunnerError::ProgramNotAvailable(program)) => {
                return Err(IacError::TerraformNotAvailable(format!(
                    "'{}' was not found on PATH",
                    program
                )))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(TerraformResult {
            command: command.to_string(),
            exit_code: result.exit_code,
            output: result.combined_output(),
        })
    }

    async fn run_command<I, S>(&self, command: &str, working_dir: &Path, args: I) -> IacResult<TerraformResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = self.command_config(working_dir, args);
        self.execute(command, config, self.stream_logs).await
    }

    async fn run_command_quiet<I, S>(
        &self,
        command: &str,
        working_dir: &Path,
        args: I,
    ) -> IacResult<TerraformResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = self.command_config(working_dir, args);
        self.execute(command, config, false).await
    }
}

/// Static validation of a Terraform configuration.
pub struct TerraformValidator {
    runner: TerraformRunner,
}

impl TerraformValidator {
    pub fn new(runner: TerraformRunner) -> Self {
        Self { runner }
    }

    /// Check formatting, initialize without a backend, then validate.
    pub async fn full_validate(&self, working_dir: &Path) -> IacResult<ValidationReport> {
        let mut report = ValidationReport::new();

        let fmt_result = self.runner.fmt_check(working_dir).await?;
        report.add_check("format", fmt_result.success(), &fmt_result.output);

        let init_result = self.runner.init_without_backend(working_dir).await?;
        if !init_result.success() {
            report.add_check("init", false, &init_result.output);
            return Ok(report);
        }
        report.add_check("init", true, "Initialization successful");

        let validate_result = self.runner.validate(working_dir).await?;
        report.add_check("validate", validate_result.success(), &validate_result.output);

        Ok(report)
    }
}

/// Validation report for a Terraform configuration.
#[derive(Debug)]
pub struct ValidationReport {
    pub checks: Vec<ValidationCheck>,
    pub passed: bool,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            checks: Vec::new(),
            passed: true,
        }
    }

    pub fn add_check(&mut self, name: &str, passed: bool, message: &str) {
        if !passed {
            self.passed = false;
        }
        self.checks.push(ValidationCheck {
            name: name.to_string(),
            passed,
            message: message.to_string(),
        });
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &ValidationCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ValidationCheck {
    pub name: String,
    pub passed: bool,
    pub message: String,
}
