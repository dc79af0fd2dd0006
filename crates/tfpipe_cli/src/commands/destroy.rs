//! Destroy command - Destroy every resource of an environment.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::warn;

use tfpipe_core::{Annotation, Validator};

use super::{absolute, Session, TargetArgs};

#[derive(Args, Debug)]
pub struct DestroyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Variable file (defaults to <parameters>/<env>-variables.tfvars)
    #[arg(long, env = "TFPIPE_VAR_FILE")]
    pub var_file: Option<PathBuf>,

    /// Repeat the environment name to confirm
    #[arg(long)]
    pub confirm: String,
}

pub async fn execute(args: DestroyArgs, session: &Session) -> Result<()> {
    let mut v = Validator::new();
    let (environment, dir) = session.check_target(&args.target, &mut v);
    let var_file = args
        .var_file
        .clone()
        .unwrap_or_else(|| session.config.var_file(&environment));
    v.file("var-file", &var_file).require(
        "confirm",
        args.confirm == environment,
        format!("must repeat the environment name '{}'", environment),
    );
    v.finish()?;

    warn!("Destroying all resources of {}", environment);
    session
        .terraform()
        .destroy(&dir, &absolute(&var_file)?)
        .await?
        .into_checked()?;

    Annotation::warning(format!("Environment '{}' was destroyed", environment))
        .with_title("Terraform destroy")
        .emit();
    Ok(())
}
