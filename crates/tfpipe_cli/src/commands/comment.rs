//! Comment command - Post the plan result on a pull request.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use tracing::info;

use tfpipe_core::Validator;
use tfpipe_github::{plan_comment, PrCommenter};
use tfpipe_iac::PlanSummary;

use super::{absolute, read_text, GithubArgs, PlanResultArgs, RunArgs, Session};

#[derive(Args, Debug)]
pub struct CommentArgs {
    /// Target environment
    #[arg(short, long, env = "TFPIPE_ENVIRONMENT")]
    pub environment: String,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(flatten)]
    pub plan: PlanResultArgs,

    #[command(flatten)]
    pub github: GithubArgs,

    /// Pull request number
    #[arg(long = "pr", env = "TFPIPE_PR_NUMBER")]
    pub pr_number: u64,

    /// One-line plan summary (parsed from the plan output when omitted)
    #[arg(long)]
    pub summary: Option<String>,

    /// File with plan output to fold into the comment
    #[arg(long, conflicts_with = "plan_file")]
    pub details_file: Option<PathBuf>,

    /// Saved plan rendered with `terraform show`
    #[arg(long)]
    pub plan_file: Option<PathBuf>,
}

async fn plan_details(args: &CommentArgs, session: &Session) -> Result<Option<String>> {
    if let Some(plan_file) = &args.plan_file {
        let plan_file = absolute(plan_file)?;
        let dir = plan_file.parent().unwrap_or_else(|| Path::new("."));
        let shown = session
            .terraform()
            .show(dir, &plan_file)
            .await?
            .into_checked()?;
        return Ok(Some(shown.output));
    }
    read_text(None, args.details_file.as_deref())
}

pub async fn execute(args: CommentArgs, session: &Session) -> Result<()> {
    let mut v = Validator::new();
    v.environment(&args.environment)
        .run_id("run-id", &args.run.run_id)
        .require("pr", args.pr_number > 0, "pull request number must be positive");
    if let Some(file) = &args.details_file {
        v.file("details-file", file);
    }
    if let Some(file) = &args.plan_file {
        v.file("plan-file", file);
    }
    v.finish()?;

    let details = plan_details(&args, session).await?;
    let summary = args.summary.clone().or_else(|| {
        details
            .as_deref()
            .and_then(PlanSummary::parse)
            .map(|s| s.to_string())
    });

    let body = plan_comment(
        &args.environment,
        args.plan.outcome(),
        summary.as_deref(),
        details.as_deref(),
        &session.ctx_for_run(&args.run),
    );

    if session.dry_run {
        info!("[DRY-RUN] Would comment on pull request #{}:\n{}", args.pr_number, body);
        return Ok(());
    }

    let gh = session.gh(&args.github);
    if !args.github.skip_auth_check {
        gh.verify_auth().await?;
    }
    PrCommenter::new(gh).comment(args.pr_number, &body).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use tempfile::tempdir;
    use tfpipe_runner::MockRunner;

    fn args(details_file: Option<PathBuf>) -> CommentArgs {
        CommentArgs {
            environment: "prod".to_string(),
            run: RunArgs {
                run_id: "12345".to_string(),
            },
            plan: PlanResultArgs { exit_code: 2 },
            github: GithubArgs {
                repo: Some("acme/infra".to_string()),
                token: None,
                skip_auth_check: true,
            },
            pr_number: 7,
            summary: None,
            details_file,
            plan_file: None,
        }
    }

    #[tokio::test]
    async fn test_comment_includes_parsed_summary() {
        let dir = tempdir().unwrap();
        let details = dir.path().join("plan.txt");
        std::fs::write(
            &details,
            "  # azurerm_resource_group.main will be created\n\nPlan: 1 to add, 0 to change, 0 to destroy.\n",
        )
        .unwrap();
        let mock = MockRunner::new();
        let session = testing::session(&mock, dir.path());

        execute(args(Some(details)), &session).await.unwrap();

        let call = &mock.get_program_calls("gh")[0];
        assert_eq!(call.command_line(), "gh pr comment 7 --body-file - --repo acme/infra");
        let body = call.stdin.clone().unwrap();
        assert!(body.contains("Plan: 1 to add, 0 to change, 0 to destroy."));
        assert!(body.contains("azurerm_resource_group.main"));
        assert!(body.contains("`prod-12345`"));
    }

    #[tokio::test]
    async fn test_zero_pr_number_rejected() {
        let dir = tempdir().unwrap();
        let mock = MockRunner::new();
        let session = testing::session(&mock, dir.path());

        let mut a = args(None);
        a.pr_number = 0;
        let err = execute(a, &session).await.unwrap_err();

        assert!(err.to_string().contains("'pr'"));
        assert_eq!(mock.call_count(), 0);
    }
}
