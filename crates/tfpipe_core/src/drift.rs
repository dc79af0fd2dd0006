//! Drift reporting.
//!
//! A scheduled plan is interpreted the same way as a deployment plan. Changes
//! keep exactly one open drift issue per environment; a clean plan closes it.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::context::RunContext;
use crate::error::CoreResult;
use crate::outcome::PlanOutcome;
use crate::tracker::{Issue, IssueTracker, NewIssue, TERRAFORM_LABEL};

pub const DRIFT_LABEL: &str = "drift";

/// What the reporter did to the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "issue", rename_all = "snake_case")]
pub enum DriftAction {
    Opened(Issue),
    AlreadyOpen(Issue),
    Closed(Issue),
    NoAction,
    /// Plan failed; issue state left untouched.
    Skipped,
}

impl DriftAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftAction::Opened(_) => "opened",
            DriftAction::AlreadyOpen(_) => "already-open",
            DriftAction::Closed(_) => "closed",
            DriftAction::NoAction => "none",
            DriftAction::Skipped => "skipped",
        }
    }

    pub fn issue(&self) -> Option<&Issue> {
        match self {
            DriftAction::Opened(i) | DriftAction::AlreadyOpen(i) | DriftAction::Closed(i) => Some(i),
            DriftAction::NoAction | DriftAction::Skipped => None,
        }
    }
}

/// Keeps the drift issue of an environment in line with the latest plan.
pub struct DriftReporter {
    tracker: Arc<dyn IssueTracker>,
    extra_labels: Vec<String>,
}

impl DriftReporter {
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

    pub fn issue_title(environment: &str) -> String {
        format!("Terraform drift detected: {}", environment)
    }

    fn issue_body(environment: &str, ctx: &RunContext, details: Option<&str>) -> String {
        let mut body = String::new();
        let _ = writeln!(body, "## Infrastructure drift detected");
        let _ = writeln!(body);
        let _ = writeln!(
            body,
            "A scheduled plan found differences between the deployed infrastructure \
             and the configuration for `{}`.",
            environment
        );
        let _ = writeln!(body);
        let _ = writeln!(body, "- **Environment:** `{}`", environment);
        let _ = writeln!(body, "- **Detected by run:** `{}`", ctx.deployment_id(environment));
        let _ = writeln!(body, "- **Ref:** `{}`", ctx.ref_display());
        if let Some(url) = ctx.run_url() {
            let _ = writeln!(body, "- **Run:** {}", url);
        }
        if let Some(details) = details {
            let _ = writeln!(body);
            let _ = writeln!(body, "```");
            let _ = writeln!(body, "{}", details.trim_end());
            let _ = writeln!(body, "```");
        }
        let _ = writeln!(body);
        let _ = writeln!(
            body,
            "This issue closes automatically once a scheduled plan reports no changes."
        );
        body
    }

    pub async fn report(
        &self,
        environment: &str,
        outcome: PlanOutcome,
        ctx: &RunContext,
        details: Option<&str>,
    ) -> CoreResult<DriftAction> {
        let title = Self::issue_title(environment);

        match outcome {
            PlanOutcome::Changes => {
                if let Some(existing) = self.tracker.find_open(&title, DRIFT_LABEL).await? {
                    info!("Drift issue #{} already open for {}", existing.number, environment);
                    return Ok(DriftAction::AlreadyOpen(existing));
                }
                let mut labels = vec![TERRAFORM_LABEL.to_string(), DRIFT_LABEL.to_string()];
                labels.extend(self.extra_labels.iter().cloned());
                let issue = self
                    .tracker
                    .create(&NewIssue {
                        title,
                        body: Self::issue_body(environment, ctx, details),
                        labels,
                    })
                    .await?;
                info!("Opened drift issue #{} for {}", issue.number, environment);
                Ok(DriftAction::Opened(issue))
            }
            PlanOutcome::NoChanges => {
                let Some(existing) = self.tracker.find_open(&title, DRIFT_LABEL).await? else {
                    info!("No drift for {}", environment);
                    return Ok(DriftAction::NoAction);
                };
                let note = format!(
                    "Drift resolved: run `{}` reported no changes.",
                    ctx.deployment_id(environment)
                );
                self.tracker.comment(existing.number, &note).await?;
                self.tracker.close(existing.number).await?;
                info!("Closed drift issue #{} for {}", existing.number, environment);
                Ok(DriftAction::Closed(existing))
            }
            PlanOutcome::Error | PlanOutcome::Unexpected(_) => {
                warn!(
                    "Plan for {} ended with {}; drift issue left unchanged",
                    environment, outcome
                );
                Ok(DriftAction::Skipped)
            }
        }
    }
}
