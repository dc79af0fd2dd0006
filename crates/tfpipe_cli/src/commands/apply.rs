//! Apply command - Apply a saved plan.
//!
//! Given the plan step's exit code, only a plan with changes is applied.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use tfpipe_core::{
    plan_file_name, Annotation, ArtifactName, ArtifactStore, DirectoryArtifactStore, PlanOutcome,
    Validator,
};

use super::{absolute, Session, TargetArgs};

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Saved plan (defaults to <working dir>/<env>.plan.tfplan)
    #[arg(long)]
    pub plan_file: Option<PathBuf>,

    /// Restore tfplan-<env>-<run id> into the working directory first
    #[arg(long)]
    pub from_artifact: bool,

    /// Run that published the plan
    #[arg(long, env = "GITHUB_RUN_ID")]
    pub run_id: Option<String>,

    /// Artifact store root (defaults to the configured one)
    #[arg(long, env = "TFPIPE_ARTIFACT_DIRECTORY")]
    pub artifact_directory: Option<PathBuf>,

    /// Exit code of the plan that produced the saved plan
    #[arg(long = "exitcode", env = "TFPIPE_PLAN_EXITCODE", allow_negative_numbers = true)]
    pub plan_exit_code: Option<i32>,
}

pub async fn execute(args: ApplyArgs, session: &Session) -> Result<()> {
    let mut v = Validator::new();
    let (environment, dir) = session.check_target(&args.target, &mut v);

    if let Some(code) = args.plan_exit_code {
        let outcome = PlanOutcome::from_exit_code(code);
        if !outcome.is_success() {
            anyhow::bail!(
                "{}; apply not attempted",
                outcome.annotation(&environment).message
            );
        }
        if !outcome.allows_apply() {
            v.finish()?;
            session.outputs.set("applied", "false")?;
            Annotation::notice(format!("No changes for '{}'; nothing to apply", environment))
                .emit();
            return Ok(());
        }
    }

    let run_id = args.run_id.clone().unwrap_or_default();
    if args.from_artifact {
        v.run_id("run-id", &run_id);
    } else {
        let plan_file = args
            .plan_file
            .clone()
            .unwrap_or_else(|| dir.join(plan_file_name(&environment)));
        v.file("plan-file", &plan_file);
    }
    v.finish()?;

    let plan_file = if args.from_artifact {
        let store = DirectoryArtifactStore::new(
            args.artifact_directory
                .clone()
                .unwrap_or_else(|| session.config.artifact_directory.clone()),
        );
        let name = ArtifactName::for_plan(&environment, &run_id);
        store.download(&name, &dir).await?
    } else {
        args.plan_file
            .clone()
            .unwrap_or_else(|| dir.join(plan_file_name(&environment)))
    };

    session
        .terraform()
        .apply(&dir, &absolute(&plan_file)?)
        .await?
        .into_checked()?;

    session.outputs.set("applied", "true")?;
    info!("Applied {:?} to {}", plan_file, environment);
    Annotation::notice(format!("Terraform apply completed for environment '{}'", environment))
        .emit();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use std::path::Path;
    use tempfile::tempdir;
    use tfpipe_runner::{MockResponse, MockRunner};

    fn args(dir: &Path) -> ApplyArgs {
        ApplyArgs {
            target: testing::target("prod", dir),
            plan_file: None,
            from_artifact: true,
            run_id: Some("12345".to_string()),
            artifact_directory: None,
            plan_exit_code: Some(2),
        }
    }

    #[tokio::test]
    async fn test_missing_artifact_fails_before_terraform() {
        let dir = tempdir().unwrap();
        let mock = MockRunner::new();
        let session = testing::session(&mock, dir.path());

        let err = execute(args(dir.path()), &session).await.unwrap_err();

        assert!(err.to_string().contains("tfplan-prod-12345"));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_apply_downloaded_plan() {
        let dir = tempdir().unwrap();
        let workdir = dir.path().join("infra");
        std::fs::create_dir_all(&workdir).unwrap();
        let built = dir.path().join("prod.plan.tfplan");
        std::fs::write(&built, b"plan-bytes").unwrap();

        let mock = MockRunner::new().add_response(MockResponse::success("Apply complete!"));
        let session = testing::session(&mock, dir.path());
        DirectoryArtifactStore::new(&session.config.artifact_directory)
            .publish(&ArtifactName::for_plan("prod", "12345"), &built)
            .await
            .unwrap();

        let mut a = args(&workdir);
        a.target = testing::target("prod", &workdir);
        execute(a, &session).await.unwrap();

        assert_eq!(std::fs::read(workdir.join("prod.plan.tfplan")).unwrap(), b"plan-bytes");
        let call = &mock.get_program_calls("terraform")[0];
        assert!(call.has_arg("-auto-approve"));
        assert!(call.args.last().unwrap().ends_with("prod.plan.tfplan"));
    }

    #[tokio::test]
    async fn test_local_plan_file_required() {
        let dir = tempdir().unwrap();
        let mock = MockRunner::new();
        let session = testing::session(&mock, dir.path());

        let mut a = args(dir.path());
        a.from_artifact = false;
        let err = execute(a, &session).await.unwrap_err();

        assert!(err.to_string().contains("prod.plan.tfplan' does not exist"));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_plan_error_never_applies() {
        for code in [1, 137, -1] {
            let dir = tempdir().unwrap();
            std::fs::write(dir.path().join("prod.plan.tfplan"), b"plan").unwrap();
            let mock = MockRunner::new();
            let session = testing::session(&mock, dir.path());

            let mut a = args(dir.path());
            a.plan_exit_code = Some(code);
            let err = execute(a, &session).await.unwrap_err();

            assert!(err.to_string().contains("apply not attempted"), "exit code {}", code);
            assert_eq!(mock.call_count(), 0, "exit code {}", code);
        }
    }

    #[tokio::test]
    async fn test_no_changes_skips_apply() {
        let dir = tempdir().unwrap();
        let mock = MockRunner::new();
        let session = testing::session(&mock, dir.path());

        let mut a = args(dir.path());
        a.plan_exit_code = Some(0);
        execute(a, &session).await.unwrap();

        assert_eq!(mock.call_count(), 0);
        assert!(testing::outputs(dir.path()).contains("applied=false\n"));
    }

    #[tokio::test]
    async fn test_changes_apply_local_plan() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("prod.plan.tfplan"), b"plan").unwrap();
        let mock = MockRunner::new().add_response(MockResponse::success("Apply complete!"));
        let session = testing::session(&mock, dir.path());

        let mut a = args(dir.path());
        a.from_artifact = false;
        execute(a, &session).await.unwrap();

        assert_eq!(mock.get_program_calls("terraform").len(), 1);
        assert!(testing::outputs(dir.path()).contains("applied=true\n"));
    }

    #[test]
    fn test_parse_exitcode() {
        use crate::commands::{Cli, Commands};
        use clap::Parser;

        let cli = Cli::try_parse_from(["tfpipe", "apply", "-e", "prod", "--exitcode", "1"]).unwrap();
        match cli.command {
            Commands::Apply(a) => assert_eq!(a.plan_exit_code, Some(1)),
            _ => panic!("expected apply"),
        }
    }

    #[tokio::test]
    async fn test_failed_apply_is_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("prod.plan.tfplan"), b"plan").unwrap();
        let mock = MockRunner::new()
            .add_response(MockResponse::failure(1, "Error: Saved plan is stale"));
        let session = testing::session(&mock, dir.path());

        let mut a = args(dir.path());
        a.from_artifact = false;
        let err = execute(a, &session).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Saved plan is stale"));
    }
}
