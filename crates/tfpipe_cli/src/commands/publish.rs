//! Publish command - Store the plan file under its transfer name.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use tfpipe_core::{
    plan_file_name, Annotation, ArtifactName, ArtifactStore, DirectoryArtifactStore, Validator,
};

use super::{RunArgs, Session, TargetArgs};

#[derive(Args, Debug)]
pub struct PublishArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub run: RunArgs,

    /// Plan file (defaults to <working dir>/<env>.plan.tfplan)
    #[arg(long)]
    pub plan_file: Option<PathBuf>,

    /// Artifact store root (defaults to the configured one)
    #[arg(long, env = "TFPIPE_ARTIFACT_DIRECTORY")]
    pub artifact_directory: Option<PathBuf>,
}

pub async fn execute(args: PublishArgs, session: &Session) -> Result<()> {
    let mut v = Validator::new();
    let (environment, dir) = session.check_target(&args.target, &mut v);
    v.run_id("run-id", &args.run.run_id);
    v.finish()?;

    let plan_file = args
        .plan_file
        .unwrap_or_else(|| dir.join(plan_file_name(&environment)));
    let store = DirectoryArtifactStore::new(
        args.artifact_directory
            .unwrap_or_else(|| session.config.artifact_directory.clone()),
    );

    let name = ArtifactName::for_plan(&environment, &args.run.run_id);
    let handle = store.publish(&name, &plan_file).await?;

    session.outputs.set("artifact-name", name.as_str())?;
    session
        .outputs
        .set("artifact-path", &handle.location.display().to_string())?;
    Annotation::notice(format!(
        "Published {} ({} bytes, kept {} days)",
        name, handle.manifest.size_bytes, handle.manifest.retention_days
    ))
    .emit();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{testing, RunArgs};
    use tempfile::tempdir;
    use tfpipe_runner::MockRunner;

    fn args(dir: &std::path::Path, run_id: &str) -> PublishArgs {
        PublishArgs {
            target: testing::target("prod", dir),
            run: RunArgs {
                run_id: run_id.to_string(),
            },
            plan_file: None,
            artifact_directory: None,
        }
    }

    #[tokio::test]
    async fn test_publish_plan() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("prod.plan.tfplan"), b"\x00plan").unwrap();
        let mock = MockRunner::new();
        let session = testing::session(&mock, dir.path());

        execute(args(dir.path(), "12345"), &session).await.unwrap();

        assert!(dir.path().join("artifacts/tfplan-prod-12345/prod.plan.tfplan").is_file());
        assert!(testing::outputs(dir.path()).contains("artifact-name=tfplan-prod-12345\n"));
    }

    #[tokio::test]
    async fn test_missing_plan_fails_loudly() {
        let dir = tempdir().unwrap();
        let mock = MockRunner::new();
        let session = testing::session(&mock, dir.path());

        let err = execute(args(dir.path(), "12345"), &session).await.unwrap_err();
        assert!(err.to_string().contains("prod.plan.tfplan"));
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_run_id_must_be_numeric() {
        let dir = tempdir().unwrap();
        let mock = MockRunner::new();
        let session = testing::session(&mock, dir.path());

        let err = execute(args(dir.path(), "latest"), &session).await.unwrap_err();
        assert!(err.to_string().contains("run-id"));
    }
}
