//! CI run context.

use serde::{Deserialize, Serialize};

/// Identity of the CI run a step belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    pub run_id: String,
    pub actor: String,
    pub git_ref: String,
    pub repository: String,
    pub sha: String,
    pub server_url: String,
}

impl RunContext {
    /// Read the context from the standard GitHub Actions variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the context from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).unwrap_or_default();
        Self {
            run_id: get("GITHUB_RUN_ID"),
            actor: get("GITHUB_ACTOR"),
            git_ref: get("GITHUB_REF"),
            repository: get("GITHUB_REPOSITORY"),
            sha: get("GITHUB_SHA"),
            server_url: lookup("GITHUB_SERVER_URL")
                .unwrap_or_else(|| "https://github.com".to_string()),
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = git_ref.into();
        self
    }

    /// Deployment identifier shown in issues: `{environment}-{run_id}`.
    pub fn deployment_id(&self, environment: &str) -> String {
        format!("{}-{}", environment, self.run_id)
    }

    /// Link to the workflow run, when the repository is known.
    pub fn run_url(&self) -> Option<String> {
        if self.repository.is_empty() || self.run_id.is_empty() {
            return None;
        }
        Some(format!(
            "{}/{}/actions/runs/{}",
            self.server_url.trim_end_matches('/'),
            self.repository,
            self.run_id
        ))
    }

    fn or_unknown(value: &str) -> &str {
        if value.is_empty() {
            "unknown"
        } else {
            value
        }
    }

    pub fn actor_display(&self) -> &str {
        Self::or_unknown(&self.actor)
    }

    pub fn ref_display(&self) -> &str {
        Self::or_unknown(&self.git_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("GITHUB_RUN_ID", "12345"),
            ("GITHUB_ACTOR", "octocat"),
            ("GITHUB_REF", "refs/heads/main"),
            ("GITHUB_REPOSITORY", "acme/infra"),
        ]
        .into_iter()
        .collect();

        let ctx = RunContext::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(ctx.run_id, "12345");
        assert_eq!(ctx.deployment_id("prod"), "prod-12345");
        assert_eq!(
            ctx.run_url().as_deref(),
            Some("https://github.com/acme/infra/actions/runs/12345")
        );
    }

    #[test]
    fn test_missing_values_display_unknown() {
        let ctx = RunContext::from_lookup(|_| None);
        assert_eq!(ctx.actor_display(), "unknown");
        assert_eq!(ctx.ref_display(), "unknown");
        assert!(ctx.run_url().is_none());
    }
}
