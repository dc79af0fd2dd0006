//! Pull request comments with plan results.

use std::fmt::Write as _;

use tracing::info;

use tfpipe_core::{PlanOutcome, RunContext};

use crate::error::GithubResult;
use crate::gh::GhCli;

/// GitHub rejects comment bodies above 65536 characters.
pub const MAX_COMMENT_CHARS: usize = 65_000;

const TRUNCATED_NOTE: &str = "\n... output truncated, see the workflow run for the full plan\n";

fn status_line(outcome: PlanOutcome) -> &'static str {
    match outcome {
        PlanOutcome::NoChanges => "No changes. Infrastructure matches the configuration.",
        PlanOutcome::Changes => "Changes detected. Review the plan before approving.",
        PlanOutcome::Error => "Plan failed.",
        PlanOutcome::Unexpected(_) => "Plan exited with an unexpected code.",
    }
}

/// Cut `text` to at most `max` bytes on a char boundary.
fn truncate(text: &str, max: usize) -> (&str, bool) {
    if text.len() <= max {
        return (text, false);
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    (&text[..end], true)
}

/// Render the Markdown comment for a plan.
///
/// `summary` is the one-line resource count; `details` the `terraform show`
/// output, folded into a collapsible block and truncated so the whole
/// body stays under [`MAX_COMMENT_CHARS`].
pub fn plan_comment(
    environment: &str,
    outcome: PlanOutcome,
    summary: Option<&str>,
    details: Option<&str>,
    ctx: &RunContext,
) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "### Terraform plan: `{}`", environment);
    let _ = writeln!(body);
    let _ = writeln!(
        body,
        "**{}** (exit code {})",
        status_line(outcome),
        outcome.exit_code()
    );
    if let Some(summary) = summary {
        let _ = writeln!(body);
        let _ = writeln!(body, "{}", summary.trim());
    }

    let mut footer = String::new();
    let _ = writeln!(footer);
    let _ = write!(
        footer,
        "*Deployment `{}` by @{} on `{}`",
        ctx.deployment_id(environment),
        ctx.actor_display(),
        ctx.ref_display()
    );
    if let Some(url) = ctx.run_url() {
        let _ = write!(footer, " ([run]({}))", url);
    }
    let _ = writeln!(footer, "*");

    if let Some(details) = details.map(str::trim_end).filter(|d| !d.is_empty()) {
        let open = "\n<details><summary>Show plan</summary>\n\n```terraform\n";
        let close = "\n```\n\n</details>\n";
        let budget = MAX_COMMENT_CHARS
            .saturating_sub(body.len() + footer.len() + open.len() + close.len() + TRUNCATED_NOTE.len());
        let (shown, cut) = truncate(details, budget);

        body.push_str(open);
        body.push_str(shown);
        if cut {
            body.push_str(TRUNCATED_NOTE);
        }
        body.push_str(close);
    }

    body.push_str(&footer);
    body
}

/// Posts comments on pull requests.
pub struct PrCommenter {
    gh: GhCli,
}

impl PrCommenter {
    pub fn new(gh: GhCli) -> Self {
        Self { gh }
    }

    /// `gh pr comment <number> --body-file -` with the body on stdin.
    pub async fn comment(&self, pr_number: u64, body: &str) -> GithubResult<()> {
        let number = pr_number.to_string();
        self.gh
            .run(["pr", "comment", number.as_str(), "--body-file", "-"], Some(body))
            .await?;
        info!("Commented on pull request #{}", pr_number);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tfpipe_runner::MockRunner;

    fn ctx() -> RunContext {
        RunContext::default()
            .with_run_id("12345")
            .with_actor("octocat")
            .with_ref("refs/pull/7/merge")
    }

    #[test]
    fn test_plan_comment_with_changes() {
        let body = plan_comment(
            "prod",
            PlanOutcome::Changes,
            Some("Plan: 1 to add, 0 to change, 0 to destroy."),
            Some("  # azurerm_resource_group.main will be created"),
            &ctx(),
        );

        assert!(body.starts_with("### Terraform plan: `prod`"));
        assert!(body.contains("Changes detected"));
        assert!(body.contains("(exit code 2)"));
        assert!(body.contains("Plan: 1 to add"));
        assert!(body.contains("<details>"));
        assert!(body.contains("azurerm_resource_group.main"));
        assert!(body.contains("`prod-12345`"));
        assert!(body.contains("@octocat"));
    }

    #[test]
    fn test_plan_comment_without_details() {
        let body = plan_comment("dev", PlanOutcome::NoChanges, None, Some("   "), &ctx());
        assert!(body.contains("No changes"));
        assert!(!body.contains("<details>"));
    }

    #[test]
    fn test_long_plan_is_truncated() {
        let details = "é".repeat(MAX_COMMENT_CHARS);
        let body = plan_comment("prod", PlanOutcome::Changes, None, Some(&details), &ctx());

        assert!(body.len() <= MAX_COMMENT_CHARS);
        assert!(body.contains("output truncated"));
        assert!(body.ends_with("*\n"));
    }

    #[tokio::test]
    async fn test_comment_posts_body_on_stdin() {
        let mock = MockRunner::new();
        let commenter = PrCommenter::new(GhCli::new(Arc::new(mock.clone())));

        commenter.comment(7, "### Terraform plan").await.unwrap();

        let call = &mock.get_program_calls("gh")[0];
        assert_eq!(call.command_line(), "gh pr comment 7 --body-file -");
        assert_eq!(call.stdin.as_deref(), Some("### Terraform plan"));
    }
}
