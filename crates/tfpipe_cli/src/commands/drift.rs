//! Drift command - Keep one drift issue per environment in step with the plan.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::info;

use tfpipe_core::{Annotation, DriftAction, DriftReporter, IssueTracker, Validator};
use tfpipe_github::GhIssueTracker;

use super::{read_text, GithubArgs, PlanResultArgs, RunArgs, Session};

#[derive(Args, Debug)]
pub struct DriftArgs {
    /// Target environment
    #[arg(short, long, env = "TFPIPE_ENVIRONMENT")]
    pub environment: String,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(flatten)]
    pub plan: PlanResultArgs,

    #[command(flatten)]
    pub github: GithubArgs,

    /// File with plan output to include in a new drift issue
    #[arg(long)]
    pub details_file: Option<PathBuf>,
}

pub async fn execute(args: DriftArgs, session: &Session) -> Result<()> {
    let mut v = Validator::new();
    v.environment(&args.environment)
        .run_id("run-id", &args.run.run_id);
    if let Some(file) = &args.details_file {
        v.file("details-file", file);
    }
    v.finish()?;

    let outcome = args.plan.outcome();
    if !outcome.is_success() {
        anyhow::bail!(
            "{}; drift issue left unchanged",
            outcome.annotation(&args.environment).message
        );
    }
    if session.dry_run {
        info!(
            "[DRY-RUN] Would reconcile the drift issue for {} ({})",
            args.environment, outcome
        );
        return Ok(());
    }

    let gh = session.gh(&args.github);
    if !args.github.skip_auth_check {
        gh.verify_auth().await?;
    }
    report(&args, session, Arc::new(GhIssueTracker::new(gh))).await
}

async fn report(args: &DriftArgs, session: &Session, tracker: Arc<dyn IssueTracker>) -> Result<()> {
    let details = read_text(None, args.details_file.as_deref())?;
    let ctx = session.ctx_for_run(&args.run);

    let reporter = DriftReporter::new(tracker).with_labels(session.labels());
    let action = reporter
        .report(&args.environment, args.plan.outcome(), &ctx, details.as_deref())
        .await?;

    session.outputs.set("action", action.as_str())?;
    if let Some(issue) = action.issue() {
        session
            .outputs
            .set("issue-number", &issue.number.to_string())?;
        session.outputs.set("issue-url", &issue.url)?;
    }

    match &action {
        DriftAction::Opened(issue) | DriftAction::AlreadyOpen(issue) => Annotation::warning(format!(
            "Drift detected for '{}', tracked in issue #{}",
            args.environment, issue.number
        ))
        .with_title("Terraform drift")
        .emit(),
        DriftAction::Closed(issue) => Annotation::notice(format!(
            "Drift resolved for '{}', closed issue #{}",
            args.environment, issue.number
        ))
        .emit(),
        DriftAction::NoAction | DriftAction::Skipped => {
            info!("No drift issue change for {}", args.environment)
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use tempfile::tempdir;
    use tfpipe_core::InMemoryIssueTracker;
    use tfpipe_runner::MockRunner;

    fn args(run_id: &str, exit_code: i32) -> DriftArgs {
        DriftArgs {
            environment: "prod".to_string(),
            run: RunArgs {
                run_id: run_id.to_string(),
            },
            plan: PlanResultArgs { exit_code },
            github: GithubArgs::default(),
            details_file: None,
        }
    }

    #[tokio::test]
    async fn test_open_then_close_across_runs() {
        let dir = tempdir().unwrap();
        let mock = MockRunner::new();
        let session = testing::session(&mock, dir.path());
        let tracker = InMemoryIssueTracker::new();

        report(&args("100", 2), &session, Arc::new(tracker.clone()))
            .await
            .unwrap();
        assert_eq!(tracker.open_count(), 1);

        report(&args("101", 0), &session, Arc::new(tracker.clone()))
            .await
            .unwrap();
        assert_eq!(tracker.open_count(), 0);
        assert_eq!(tracker.total_count(), 1);

        let outputs = testing::outputs(dir.path());
        assert!(outputs.contains("action=opened\n"));
        assert!(outputs.contains("action=closed\n"));
    }

    #[tokio::test]
    async fn test_error_exit_code_touches_nothing() {
        let dir = tempdir().unwrap();
        let mock = MockRunner::new();
        let session = testing::session(&mock, dir.path());

        let err = execute(args("100", 1), &session).await.unwrap_err();

        assert!(err.to_string().contains("drift issue left unchanged"));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_gh_auth_failure_is_reported() {
        let dir = tempdir().unwrap();
        let mock = MockRunner::new().add_response(tfpipe_runner::MockResponse::failure(
            1,
            "You are not logged into any GitHub hosts.",
        ));
        let session = testing::session(&mock, dir.path());

        let err = execute(args("100", 2), &session).await.unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("not logged into any GitHub hosts"));
        assert!(msg.contains("GITHUB_TOKEN"));
    }
}
