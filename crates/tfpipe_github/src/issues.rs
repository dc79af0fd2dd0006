//! Issue tracker backed by `gh issue`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use tfpipe_core::{CoreResult, Issue, IssueTracker, NewIssue};

use crate::error::{GithubError, GithubResult};
use crate::gh::GhCli;

#[derive(Debug, Deserialize)]
struct ListedIssue {
    number: u64,
    title: String,
    #[serde(default)]
    url: String,
}

/// Parse the issue number from the URL `gh issue create` prints.
fn issue_number_from_url(url: &str) -> GithubResult<u64> {
    url.trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| GithubError::UnexpectedOutput(format!("no issue number in '{}'", url.trim())))
}

/// GitHub Issues through the `gh` CLI.
pub struct GhIssueTracker {
    gh: GhCli,
}

impl GhIssueTracker {
    pub fn new(gh: GhCli) -> Self {
        Self { gh }
    }

    async fn search_open(&self, title: &str, label: &str) -> GithubResult<Vec<ListedIssue>> {
        let search = format!("\"{}\" in:title", title.replace('"', ""));
        let result = self
            .gh
            .run(
                [
                    "issue", "list", "--state", "open", "--label", label, "--search", search.as_str(),
                    "--json", "number,title,url", "--limit", "100",
                ],
                None,
            )
            .await?;
        let issues: Vec<ListedIssue> = serde_json::from_str(result.stdout.trim())?;
        Ok(issues)
    }
}

#[async_trait]
impl IssueTracker for GhIssueTracker {
    async fn find_open(&self, title: &str, label: &str) -> CoreResult<Option<Issue>> {
        let listed = self.search_open(title, label).await?;
        debug!("{} open issue(s) labelled {} match search", listed.len(), label);

        // Search is fuzzy; only an exact title counts.
        Ok(listed
            .into_iter()
            .find(|i| i.title == title)
            .map(|i| Issue {
                number: i.number,
                title: i.title,
                url: i.url,
            }))
    }

    async fn list_open(&self, prefix: &str, label: &str) -> CoreResult<Vec<Issue>> {
        let listed = self.search_open(prefix.trim_end(), label).await?;
        Ok(listed
            .into_iter()
            .filter(|i| i.title.starts_with(prefix))
            .map(|i| Issue {
                number: i.number,
                title: i.title,
                url: i.url,
            })
            .collect())
    }

    async fn create(&self, issue: &NewIssue) -> CoreResult<Issue> {
        let mut args = vec![
            "issue".to_string(),
            "create".to_string(),
            "--title".to_string(),
            issue.title.clone(),
            "--body-file".to_string(),
            "-".to_string(),
        ];
        for label in &issue.labels {
            args.push("--label".to_string());
            args.push(label.clone());
        }

        let result = self.gh.run(args, Some(&issue.body)).await?;
        let url = result.stdout.trim().to_string();
        let number = issue_number_from_url(&url)?;
        info!("Created issue #{}: {}", number, issue.title);

        Ok(Issue {
            number,
            title: issue.title.clone(),
            url,
        })
    }

    async fn comment(&self, number: u64, body: &str) -> CoreResult<()> {
        let number = number.to_string();
        self.gh
            .run(["issue", "comment", number.as_str(), "--body-file", "-"], Some(body))
            .await?;
        Ok(())
    }

    async fn close(&self, number: u64) -> CoreResult<()> {
        let number = number.to_string();
        self.gh.run(["issue", "close", number.as_str()], None).await?;
        info!("Closed issue #{}", number);
        Ok(())
    }
}
