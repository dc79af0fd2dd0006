//! Validate command - Formatting check, init without backend, validate.

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use tfpipe_core::{Annotation, Validator};
use tfpipe_iac::{has_terraform_files, TerraformValidator};
use tfpipe_runner::last_output_line;

use super::{Session, TargetArgs};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

pub async fn execute(args: ValidateArgs, session: &Session) -> Result<()> {
    let mut v = Validator::new();
    let (_, dir) = session.check_target(&args.target, &mut v);
    if dir.is_dir() {
        v.require(
            "working-directory",
            has_terraform_files(&dir),
            format!("No Terraform files (*.tf) in '{}'", dir.display()),
        );
    }
    v.finish()?;

    let report = TerraformValidator::new(session.terraform())
        .full_validate(&dir)
        .await?;

    for check in &report.checks {
        if check.passed {
            info!("{}: passed", check.name);
        } else {
            warn!("{}: failed", check.name);
        }
    }
    session
        .outputs
        .set("valid", if report.passed { "true" } else { "false" })?;

    if !report.passed {
        let failed: Vec<String> = report
            .failed_checks()
            .map(|c| format!("{} ({})", c.name, last_output_line(&c.message).unwrap_or("no output")))
            .collect();
        anyhow::bail!("Terraform validation failed: {}", failed.join("; "));
    }

    Annotation::notice(format!("Terraform configuration in '{}' is valid", dir.display())).emit();
    Ok(())
}
