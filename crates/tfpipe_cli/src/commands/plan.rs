//! Plan command - `terraform plan -detailed-exitcode` for one environment.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use tfpipe_core::{PlanOutcome, Validator};
use tfpipe_iac::{PlanOptions, PlanSummary};

use super::{absolute, Session, TargetArgs};

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Variable file (defaults to <parameters>/<env>-variables.tfvars)
    #[arg(long, env = "TFPIPE_VAR_FILE")]
    pub var_file: Option<PathBuf>,

    /// Plan a destroy
    #[arg(long)]
    pub destroy: bool,

    /// Exit with 2 when the plan has changes
    #[arg(long)]
    pub detailed_exitcode: bool,
}

/// Run the plan and classify its exit code.
///
/// Exit code 2 is returned as [`PlanOutcome::Changes`], not as an error.
pub async fn execute(args: PlanArgs, session: &Session) -> Result<PlanOutcome> {
    let mut v = Validator::new();
    let (environment, dir) = session.check_target(&args.target, &mut v);
    let var_file = args
        .var_file
        .clone()
        .unwrap_or_else(|| session.config.var_file(&environment));
    v.file("var-file", &var_file);
    v.finish()?;

    let mut options = PlanOptions::new(&environment, absolute(&var_file)?);
    if args.destroy {
        options = options.destroy();
    }

    let result = session.terraform().plan(&dir, &options).await?;
    let outcome = PlanOutcome::from_exit_code(result.exit_code);
    info!("Plan for {} finished: {}", environment, outcome);

    session
        .outputs
        .set("exitcode", &outcome.exit_code().to_string())?;

    if !outcome.is_success() {
        anyhow::bail!(
            "{}: {}",
            outcome.annotation(&environment).message,
            result.last_line()
        );
    }

    let summary = PlanSummary::parse(&result.output);
    session
        .outputs
        .set("has-changes", if outcome.has_changes() { "true" } else { "false" })?;
    session
        .outputs
        .set("plan-file", &dir.join(options.plan_file()).display().to_string())?;
    if let Some(summary) = &summary {
        session.outputs.set("summary", &summary.to_string())?;
    }

    session.step_summary.append(&format!(
        "### Terraform plan: `{}`\n\n{} (exit code {})\n",
        environment,
        summary
            .map(|s| s.to_string())
            .unwrap_or_else(|| outcome.as_str().to_string()),
        outcome.exit_code()
    ))?;

    outcome.annotation(&environment).emit();
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use std::path::Path;
    use tempfile::tempdir;
    use tfpipe_runner::{MockResponse, MockRunner};

    fn setup(dir: &Path) {
        std::fs::create_dir_all(dir.join("parameters")).unwrap();
        std::fs::write(dir.join("parameters/prod-variables.tfvars"), "location = \"westeurope\"\n")
            .unwrap();
    }

    fn args(environment: &str, dir: &Path) -> PlanArgs {
        PlanArgs {
            target: testing::target(environment, dir),
            var_file: None,
            destroy: false,
            detailed_exitcode: true,
        }
    }

    #[tokio::test]
    async fn test_changes_are_success() {
        let dir = tempdir().unwrap();
        setup(dir.path());
        let mock = MockRunner::new()
            .add_response(MockResponse::exit(2, "Plan: 2 to add, 1 to change, 0 to destroy.\n"));
        let session = testing::session(&mock, dir.path());

        let outcome = execute(args("prod", dir.path()), &session).await.unwrap();

        assert_eq!(outcome, PlanOutcome::Changes);
        let outputs = testing::outputs(dir.path());
        assert!(outputs.contains("exitcode=2\n"));
        assert!(outputs.contains("has-changes=true\n"));
        assert!(outputs.contains("summary=Plan: 2 to add, 1 to change, 0 to destroy.\n"));

        let call = &mock.get_program_calls("terraform")[0];
        assert!(call.has_arg("-detailed-exitcode"));
        assert!(call.has_arg("-out=prod.plan.tfplan"));
        assert!(call
            .args
            .iter()
            .any(|a| a.starts_with("-var-file=") && a.ends_with("prod-variables.tfvars")));
    }

    #[tokio::test]
    async fn test_error_still_reports_exitcode() {
        let dir = tempdir().unwrap();
        setup(dir.path());
        let mock = MockRunner::new()
            .add_response(MockResponse::failure(1, "Error: Error acquiring the state lock"));
        let session = testing::session(&mock, dir.path());

        let err = execute(args("prod", dir.path()), &session).await.unwrap_err();

        assert!(err.to_string().contains("Terraform plan failed"));
        assert!(err.to_string().contains("state lock"));
        assert!(testing::outputs(dir.path()).contains("exitcode=1\n"));
    }

    #[tokio::test]
    async fn test_unexpected_code_is_distinct() {
        let dir = tempdir().unwrap();
        setup(dir.path());
        let mock = MockRunner::new().add_response(MockResponse::failure(137, "Killed"));
        let session = testing::session(&mock, dir.path());

        let err = execute(args("prod", dir.path()), &session).await.unwrap_err();
        assert!(err.to_string().contains("unexpected code 137"));
    }

    #[tokio::test]
    async fn test_missing_var_file_stops_before_terraform() {
        let dir = tempdir().unwrap();
        let mock = MockRunner::new();
        let session = testing::session(&mock, dir.path());

        let err = execute(args("prod", dir.path()), &session).await.unwrap_err();

        assert!(err.to_string().contains("prod-variables.tfvars' does not exist"));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_changes() {
        let dir = tempdir().unwrap();
        setup(dir.path());
        let mock = MockRunner::new().add_response(MockResponse::success(
            "No changes. Your infrastructure matches the configuration.",
        ));
        let session = testing::session(&mock, dir.path());

        let outcome = execute(args("prod", dir.path()), &session).await.unwrap();

        assert_eq!(outcome, PlanOutcome::NoChanges);
        assert!(testing::outputs(dir.path()).contains("has-changes=false\n"));
        let summary = std::fs::read_to_string(dir.path().join("step_summary.md")).unwrap();
        assert!(summary.contains("No changes."));
    }
}
