//! Fmt command - Check or rewrite Terraform formatting.

use anyhow::Result;
use clap::Args;
use tracing::info;

use tfpipe_core::{Annotation, Validator};

use super::{Session, TargetArgs};

#[derive(Args, Debug)]
pub struct FmtArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Rewrite files instead of checking them
    #[arg(long)]
    pub write: bool,
}

/// File names `terraform fmt` lists, one per line.
fn listed_files(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| l.ends_with(".tf") || l.ends_with(".tfvars"))
        .filter(|l| !l.starts_with("---") && !l.starts_with("+++"))
        .map(String::from)
        .collect()
}

pub async fn execute(args: FmtArgs, session: &Session) -> Result<()> {
    let mut v = Validator::new();
    let (_, dir) = session.check_target(&args.target, &mut v);
    v.finish()?;

    let terraform = session.terraform();

    if args.write {
        let result = terraform.fmt(&dir).await?.into_checked()?;
        let files = listed_files(&result.output);
        info!("Formatted {} file(s)", files.len());
        session.outputs.set("changed-files", &files.join("\n"))?;
        return Ok(());
    }

    let result = terraform.fmt_check(&dir).await?;
    let files = listed_files(&result.output);
    session.outputs.set("changed-files", &files.join("\n"))?;
    if !result.success() {
        if files.is_empty() {
            result.into_checked()?;
        } else {
            anyhow::bail!(
                "Terraform files are not formatted: {}. Run 'terraform fmt -recursive'",
                files.join(", ")
            );
        }
    }

    Annotation::notice("Terraform formatting is consistent").emit();
    Ok(())
}
