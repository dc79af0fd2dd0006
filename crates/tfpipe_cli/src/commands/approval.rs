//! Approval command - Open the approval issue for pending changes.
//!
//! The issue is the gate: the workflow waits for a reviewer's `/approve`
//! comment before running apply. Nothing here records approval. A plan
//! without changes closes approval issues earlier runs left open.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::info;

use tfpipe_core::{Annotation, ApprovalGate, IssueTracker, Validator, APPROVE_COMMAND};
use tfpipe_github::GhIssueTracker;

use super::{read_text, GithubArgs, PlanResultArgs, RunArgs, Session};

#[derive(Args, Debug)]
pub struct ApprovalArgs {
    /// Target environment
    #[arg(short, long, env = "TFPIPE_ENVIRONMENT")]
    pub environment: String,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(flatten)]
    pub plan: PlanResultArgs,

    #[command(flatten)]
    pub github: GithubArgs,

    /// Plan summary to quote in the issue
    #[arg(long)]
    pub summary: Option<String>,

    /// File holding the plan summary
    #[arg(long, conflicts_with = "summary")]
    pub summary_file: Option<PathBuf>,
}

pub async fn execute(args: ApprovalArgs, session: &Session) -> Result<()> {
    let mut v = Validator::new();
    v.environment(&args.environment)
        .run_id("run-id", &args.run.run_id);
    v.finish()?;

    let outcome = args.plan.outcome();
    if !outcome.is_success() {
        anyhow::bail!(
            "{}; approval not requested",
            outcome.annotation(&args.environment).message
        );
    }
    let required = outcome.requires_approval();
    session
        .outputs
        .set("approval-required", if required { "true" } else { "false" })?;
    if !required {
        Annotation::notice(format!(
            "No changes for '{}'; approval not required",
            args.environment
        ))
        .emit();
    }
    if session.dry_run {
        info!("[DRY-RUN] Would update approval issues for {}", args.environment);
        return Ok(());
    }

    let gh = session.gh(&args.github);
    if !args.github.skip_auth_check {
        gh.verify_auth().await?;
    }
    let tracker: Arc<dyn IssueTracker> = Arc::new(GhIssueTracker::new(gh));
    if required {
        request(&args, session, tracker).await
    } else {
        resolve(&args, session, tracker).await
    }
}

async fn resolve(
    args: &ApprovalArgs,
    session: &Session,
    tracker: Arc<dyn IssueTracker>,
) -> Result<()> {
    let ctx = session.ctx_for_run(&args.run);
    let closed = ApprovalGate::new(tracker)
        .resolve(&args.environment, &ctx)
        .await?;

    let numbers: Vec<String> = closed.iter().map(|i| i.number.to_string()).collect();
    session.outputs.set("closed-issues", &numbers.join(","))?;
    if !closed.is_empty() {
        info!(
            "Closed {} approval issue(s) for {}: #{}",
            closed.len(),
            args.environment,
            numbers.join(", #")
        );
    }
    Ok(())
}

async fn request(
    args: &ApprovalArgs,
    session: &Session,
    tracker: Arc<dyn IssueTracker>,
) -> Result<()> {
    let summary = read_text(args.summary.as_deref(), args.summary_file.as_deref())?;
    let ctx = session.ctx_for_run(&args.run);

    let gate = ApprovalGate::new(tracker).with_labels(session.labels());
    let issue = gate
        .request(&args.environment, &ctx, args.plan.outcome(), summary.as_deref())
        .await?;

    if let Some(issue) = issue {
        session
            .outputs
            .set("issue-number", &issue.number.to_string())?;
        session.outputs.set("issue-url", &issue.url)?;
        Annotation::warning(format!(
            "Approval required for '{}': comment {} on issue #{} {}",
            args.environment, APPROVE_COMMAND, issue.number, issue.url
        ))
        .with_title("Terraform approval required")
        .emit();
    }
    Ok(())
}
