//! Summary command - Render the deployment summary.

use anyhow::Result;
use clap::Args;

use tfpipe_core::{Annotation, PipelineSummary, StageResult, Validator};

use super::{RunArgs, Session};

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Target environment
    #[arg(short, long, env = "TFPIPE_ENVIRONMENT")]
    pub environment: String,

    #[command(flatten)]
    pub run: RunArgs,

    /// Stage result as stage=result, e.g. plan=success (repeatable)
    #[arg(long = "stage")]
    pub stages: Vec<StageResult>,

    /// Exit code of the plan stage
    #[arg(long, allow_negative_numbers = true)]
    pub plan_exitcode: Option<i32>,

    /// Fail the step when any stage failed or was cancelled
    #[arg(long)]
    pub fail_on_failure: bool,
}

pub async fn execute(args: SummaryArgs, session: &Session) -> Result<()> {
    let mut v = Validator::new();
    v.environment(&args.environment)
        .run_id("run-id", &args.run.run_id);
    v.finish()?;

    let ctx = session.ctx_for_run(&args.run);
    let mut summary = PipelineSummary::new(&args.environment, ctx.deployment_id(&args.environment));
    if let Some(code) = args.plan_exitcode {
        summary = summary.with_plan_exit_code(code);
    }
    for stage in args.stages {
        summary.add_stage(stage);
    }

    let markdown = summary.to_markdown();
    session.outputs.set("summary", &markdown)?;
    session
        .outputs
        .set("result", if summary.passed() { "success" } else { "failure" })?;
    session.step_summary.append(&markdown)?;

    if !summary.passed() {
        if args.fail_on_failure {
            anyhow::bail!("Deployment '{}' failed", summary.deployment_id);
        }
        Annotation::warning(format!("Deployment '{}' failed", summary.deployment_id)).emit();
    }
    Ok(())
}
