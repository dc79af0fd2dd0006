//! Download command - Restore the plan file published by an earlier job.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use tfpipe_core::{ArtifactName, ArtifactStore, DirectoryArtifactStore, Validator};

use super::{RunArgs, Session, TargetArgs};

#[derive(Args, Debug)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub run: RunArgs,

    /// Destination directory (defaults to the working directory)
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Artifact store root (defaults to the configured one)
    #[arg(long, env = "TFPIPE_ARTIFACT_DIRECTORY")]
    pub artifact_directory: Option<PathBuf>,
}

pub async fn execute(args: DownloadArgs, session: &Session) -> Result<()> {
    let mut v = Validator::new();
    let (environment, dir) = session.check_target(&args.target, &mut v);
    v.run_id("run-id", &args.run.run_id);
    v.finish()?;

    let store = DirectoryArtifactStore::new(
        args.artifact_directory
            .unwrap_or_else(|| session.config.artifact_directory.clone()),
    );
    let name = ArtifactName::for_plan(&environment, &args.run.run_id);
    let dest = args.dest.unwrap_or(dir);

    let restored = store.download(&name, &dest).await?;
    info!("Restored {} to {:?}", name, restored);
    session
        .outputs
        .set("plan-file", &restored.display().to_string())?;
    Ok(())
}
