//! `gh` command wrapper.

use std::sync::Arc;

use tracing::{debug, info};

use tfpipe_runner::{CommandConfig, CommandRunner, ExecutionResult, RunConfig};

use crate::error::{GithubError, GithubResult};

const AUTH_HINT: &str =
    "Set GITHUB_TOKEN or GH_TOKEN for this step, or run 'gh auth login' locally";

/// Runs `gh` subcommands, optionally pinned to a repository.
#[derive(Clone)]
pub struct GhCli {
    runner: Arc<dyn CommandRunner>,
    repo: Option<String>,
    token: Option<String>,
}

impl GhCli {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            repo: None,
            token: None,
        }
    }

    /// Target `owner/name` instead of the repository of the working directory.
    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    /// Token passed to `gh` as `GH_TOKEN`.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn config<I, S>(&self, args: I, stdin: Option<&str>) -> CommandConfig
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = CommandConfig::new("gh").args(args);
        if let Some(repo) = &self.repo {
            config = config.args(["--repo", repo.as_str()]);
        }
        if let Some(token) = &self.token {
            config = config.env("GH_TOKEN", token.as_str());
        }
        if let Some(input) = stdin {
            config = config.stdin(input);
        }
        config
    }

    /// Run a `gh` subcommand, failing on a non-zero exit.
    pub async fn run<I, S>(&self, args: I, stdin: Option<&str>) -> GithubResult<ExecutionResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = self.config(args, stdin);
        let command = config.args.first().cloned().unwrap_or_default();
        debug!("Executing {}", config.display());

        let result = self
            .runner
            .run(&config, &RunConfig::default().timeout(120))
            .await?;

        if !result.success() {
            return Err(GithubError::CommandFailed {
                command,
                message: result
                    .last_error_line()
                    .unwrap_or("no output")
                    .to_string(),
            });
        }
        Ok(result)
    }

    /// Verify `gh` is installed and authenticated.
    pub async fn verify_auth(&self) -> GithubResult<()> {
        if !self.runner.is_available("gh").await? {
            return Err(GithubError::Authentication {
                message: "'gh' was not found on PATH".to_string(),
                hint: AUTH_HINT.to_string(),
            });
        }

        let mut config = CommandConfig::new("gh").args(["auth", "status"]);
        if let Some(token) = &self.token {
            config = config.env("GH_TOKEN", token.as_str());
        }
        let result = self.runner.run(&config, &RunConfig::default().timeout(60)).await?;
        if !result.success() {
            return Err(GithubError::Authentication {
                message: result
                    .last_error_line()
                    .unwrap_or("not logged in")
                    .to_string(),
                hint: AUTH_HINT.to_string(),
            });
        }
        info!("GitHub CLI authenticated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfpipe_runner::{MockResponse, MockRunner};

    #[tokio::test]
    async fn test_repo_and_token_are_applied() {
        let mock = MockRunner::new();
        let gh = GhCli::new(Arc::new(mock.clone()))
            .with_repo("acme/infra")
            .with_token("ghs_example");

        gh.run(["issue", "close", "7"], None).await.unwrap();

        let call = &mock.get_program_calls("gh")[0];
        assert_eq!(call.command_line(), "gh issue close 7 --repo acme/infra");
        assert_eq!(call.env.get("GH_TOKEN").map(String::as_str), Some("ghs_example"));
    }

    #[tokio::test]
    async fn test_failure_is_error() {
        let mock = MockRunner::new()
            .add_response(MockResponse::failure(1, "GraphQL: Could not resolve to an issue"));
        let gh = GhCli::new(Arc::new(mock));

        let err = gh.run(["issue", "close", "99"], None).await.unwrap_err();
        assert!(matches!(err, GithubError::CommandFailed { ref command, .. } if command == "issue"));
        assert!(err.to_string().contains("Could not resolve"));
    }

    #[tokio::test]
    async fn test_verify_auth() {
        let ok = MockRunner::new();
        assert!(GhCli::new(Arc::new(ok)).verify_auth().await.is_ok());

        let logged_out = MockRunner::new().add_response(MockResponse::failure(
            1,
            "You are not logged into any GitHub hosts. To log in, run: gh auth login",
        ));
        let err = GhCli::new(Arc::new(logged_out)).verify_auth().await.unwrap_err();
        assert!(matches!(err, GithubError::Authentication { .. }));
        assert!(err.to_string().contains("GITHUB_TOKEN"));

        let missing = MockRunner::new().set_unavailable("gh");
        assert!(GhCli::new(Arc::new(missing)).verify_auth().await.is_err());
    }
}
