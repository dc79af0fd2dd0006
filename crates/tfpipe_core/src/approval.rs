//! Approval gate.
//!
//! When a plan reports changes, an approval issue is opened for the
//! deployment. Progression to apply waits on an out-of-band `/approve`
//! comment observed by the orchestrator; no approval state lives here.
//! A later clean plan closes whatever approval issues are still open for
//! the environment.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::info;

use crate::context::RunContext;
use crate::error::CoreResult;
use crate::outcome::PlanOutcome;
use crate::tracker::{Issue, IssueTracker, NewIssue, TERRAFORM_LABEL};

pub const APPROVAL_LABEL: &str = "approval-required";

/// Comment a reviewer posts to release the deployment.
pub const APPROVE_COMMAND: &str = "/approve";

/// Opens approval issues for pending changes.
pub struct ApprovalGate {
    tracker: Arc<dyn IssueTracker>,
    extra_labels: Vec<String>,
}

impl ApprovalGate {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self {
            tracker,
            extra_labels: Vec::new(),
        }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.extra_labels = labels;
        self
    }

    /// Title shared by every approval issue of an environment.
    fn title_prefix(environment: &str) -> String {
        format!("Terraform approval required: {} (run ", environment)
    }

    pub fn issue_title(environment: &str, ctx: &RunContext) -> String {
        format!("{}{})", Self::title_prefix(environment), ctx.run_id)
    }

    pub fn issue_body(environment: &str, ctx: &RunContext, plan_summary: Option<&str>) -> String {
        let mut body = String::new();
        let _ = writeln!(body, "## Terraform deployment approval");
        let _ = writeln!(body);
        let _ = writeln!(body, "| | |");
        let _ = writeln!(body, "|---|---|");
        let _ = writeln!(body, "| **Environment** | `{}` |", environment);
        let _ = writeln!(body, "| **Deployment** | `{}` |", ctx.deployment_id(environment));
        let _ = writeln!(body, "| **Requested by** | @{} |", ctx.actor_display());
        let _ = writeln!(body, "| **Ref** | `{}` |", ctx.ref_display());
        if let Some(url) = ctx.run_url() {
            let _ = writeln!(body, "| **Run** | {} |", url);
        }
        if let Some(summary) = plan_summary {
            let _ = writeln!(body);
            let _ = writeln!(body, "### Plan");
            let _ = writeln!(body);
            let _ = writeln!(body, "```");
            let _ = writeln!(body, "{}", summary.trim_end());
            let _ = writeln!(body, "```");
        }
        let _ = writeln!(body);
        let _ = writeln!(
            body,
            "Comment `{}` to approve this deployment.",
            APPROVE_COMMAND
        );
        body
    }

    /// Open (or reuse) the approval issue when the plan has changes.
    ///
    /// Returns `None` for every outcome other than [`PlanOutcome::Changes`].
    pub async fn request(
        &self,
        environment: &str,
        ctx: &RunContext,
        outcome: PlanOutcome,
        plan_summary: Option<&str>,
    ) -> CoreResult<Option<Issue>> {
        if !outcome.requires_approval() {
            info!("Plan outcome {} needs no approval for {}", outcome, environment);
            return Ok(None);
        }

        let title = Self::issue_title(environment, ctx);
        if let Some(existing) = self.tracker.find_open(&title, APPROVAL_LABEL).await? {
            info!("Approval issue #{} already open for {}", existing.number, environment);
            return Ok(Some(existing));
        }

        let mut labels = vec![TERRAFORM_LABEL.to_string(), APPROVAL_LABEL.to_string()];
        labels.extend(self.extra_labels.iter().cloned());

        let issue = self
            .tracker
            .create(&NewIssue {
                title,
                body: Self::issue_body(environment, ctx, plan_summary),
                labels,
            })
            .await?;
        info!("Opened approval issue #{} for {}", issue.number, environment);
        Ok(Some(issue))
    }

    /// Close approval issues left open for `environment` once a run plans
    /// no changes. Returns the issues closed.
    pub async fn resolve(&self, environment: &str, ctx: &RunContext) -> CoreResult<Vec<Issue>> {
        let stale = self
            .tracker
            .list_open(&Self::title_prefix(environment), APPROVAL_LABEL)
            .await?;

        for issue in &stale {
            let comment = format!(
                "Run {} planned no changes for `{}`; this approval is no longer needed.",
                ctx.deployment_id(environment),
                environment
            );
            self.tracker.comment(issue.number, &comment).await?;
            self.tracker.close(issue.number).await?;
            info!("Closed stale approval issue #{} for {}", issue.number, environment);
        }
        Ok(stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::InMemoryIssueTracker;

    fn ctx() -> RunContext {
        RunContext::default()
            .with_run_id("12345")
            .with_actor("octocat")
            .with_ref("refs/heads/main")
    }

    #[tokio::test]
    async fn test_changes_open_issue() {
        let tracker = InMemoryIssueTracker::new();
        let gate = ApprovalGate::new(Arc::new(tracker.clone()));

        let issue = gate
            .request("prod", &ctx(), PlanOutcome::Changes, Some("Plan: 1 to add, 0 to change, 0 to destroy."))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(issue.title, "Terraform approval required: prod (run 12345)");
        let body = tracker.body(issue.number).unwrap();
        assert!(body.contains("`prod`"));
        assert!(body.contains("`prod-12345`"));
        assert!(body.contains("@octocat"));
        assert!(body.contains("refs/heads/main"));
        assert!(body.contains("/approve"));
        assert!(body.contains("Plan: 1 to add"));
        assert_eq!(
            tracker.labels(issue.number).unwrap(),
            vec!["terraform".to_string(), "approval-required".to_string()]
        );
    }

    #[tokio::test]
    async fn test_no_issue_without_changes() {
        let tracker = InMemoryIssueTracker::new();
        let gate = ApprovalGate::new(Arc::new(tracker.clone()));

        for outcome in [PlanOutcome::NoChanges, PlanOutcome::Error, PlanOutcome::Unexpected(9)] {
            assert!(gate.request("prod", &ctx(), outcome, None).await.unwrap().is_none());
        }
        assert_eq!(tracker.total_count(), 0);
    }

    #[tokio::test]
    async fn test_clean_run_closes_stale_approvals() {
        let tracker = InMemoryIssueTracker::new();
        let gate = ApprovalGate::new(Arc::new(tracker.clone()));
        let earlier = RunContext::default().with_run_id("111");
        gate.request("prod", &earlier, PlanOutcome::Changes, None).await.unwrap();
        gate.request("prod-eu", &earlier, PlanOutcome::Changes, None).await.unwrap();

        let closed = gate.resolve("prod", &ctx()).await.unwrap();

        assert_eq!(closed.len(), 1);
        assert!(!tracker.is_open(closed[0].number));
        assert!(tracker.comments(closed[0].number)[0].contains("prod-12345"));
        assert_eq!(
            tracker.open_titles(),
            vec!["Terraform approval required: prod-eu (run 111)".to_string()]
        );

        assert!(gate.resolve("prod", &ctx()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rerequest_reuses_issue() {
        let tracker = InMemoryIssueTracker::new();
        let gate = ApprovalGate::new(Arc::new(tracker.clone())).with_labels(vec!["infra".into()]);

        let first = gate.request("prod", &ctx(), PlanOutcome::Changes, None).await.unwrap();
        let second = gate.request("prod", &ctx(), PlanOutcome::Changes, None).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(tracker.total_count(), 1);
        assert!(tracker.labels(1).unwrap().contains(&"infra".to_string()));
    }
}
