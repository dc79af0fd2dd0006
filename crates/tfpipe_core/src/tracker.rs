//! Issue tracker capability.
//!
//! Approval and drift issues live in an external tracker keyed by title.
//! Nothing about them is kept in process; existence is looked up each run.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{CoreError, CoreResult};

/// Label carried by every issue tfpipe opens.
pub const TERRAFORM_LABEL: &str = "terraform";

/// An issue as seen in the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// Payload for a new issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// External issue tracker.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Find an open issue with exactly `title` that carries `label`.
    async fn find_open(&self, title: &str, label: &str) -> CoreResult<Option<Issue>>;

    /// Open issues carrying `label` whose title starts with `prefix`.
    async fn list_open(&self, prefix: &str, label: &str) -> CoreResult<Vec<Issue>>;

    async fn create(&self, issue: &NewIssue) -> CoreResult<Issue>;

    async fn comment(&self, number: u64, body: &str) -> CoreResult<()>;

    async fn close(&self, number: u64) -> CoreResult<()>;
}

#[derive(Debug, Clone)]
struct StoredIssue {
    issue: Issue,
    body: String,
    labels: Vec<String>,
    comments: Vec<String>,
    open: bool,
}

/// In-memory tracker for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIssueTracker {
    issues: Arc<RwLock<Vec<StoredIssue>>>,
}

impl InMemoryIssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Titles of all open issues.
    pub fn open_titles(&self) -> Vec<String> {
        self.issues
            .read()
            .iter()
            .filter(|s| s.open)
            .map(|s| s.issue.title.clone())
            .collect()
    }

    pub fn open_count(&self) -> usize {
        self.issues.read().iter().filter(|s| s.open).count()
    }

    pub fn total_count(&self) -> usize {
        self.issues.read().len()
    }

    pub fn body(&self, number: u64) -> Option<String> {
        self.find(number, |s| s.body.clone())
    }

    pub fn labels(&self, number: u64) -> Option<Vec<String>> {
        self.find(number, |s| s.labels.clone())
    }

    pub fn comments(&self, number: u64) -> Vec<String> {
        self.find(number, |s| s.comments.clone()).unwrap_or_default()
    }

    pub fn is_open(&self, number: u64) -> bool {
        self.find(number, |s| s.open).unwrap_or(false)
    }

    fn find<T>(&self, number: u64, f: impl Fn(&StoredIssue) -> T) -> Option<T> {
        self.issues
            .read()
            .iter()
            .find(|s| s.issue.number == number)
            .map(f)
    }

    fn update(&self, number: u64, f: impl FnOnce(&mut StoredIssue)) -> CoreResult<()> {
        let mut issues = self.issues.write();
        let stored = issues
            .iter_mut()
            .find(|s| s.issue.number == number)
            .ok_or_else(|| CoreError::Tracker(format!("issue #{} not found", number)))?;
        f(stored);
        Ok(())
    }
}

#[async_trait]
impl IssueTracker for InMemoryIssueTracker {
    async fn find_open(&self, title: &str, label: &str) -> CoreResult<Option<Issue>> {
        Ok(self
            .issues
            .read()
            .iter()
            .find(|s| s.open && s.issue.title == title && s.labels.iter().any(|l| l == label))
            .map(|s| s.issue.clone()))
    }

    async fn list_open(&self, prefix: &str, label: &str) -> CoreResult<Vec<Issue>> {
        Ok(self
            .issues
            .read()
            .iter()
            .filter(|s| {
                s.open && s.issue.title.starts_with(prefix) && s.labels.iter().any(|l| l == label)
            })
            .map(|s| s.issue.clone())
            .collect())
    }

    async fn create(&self, issue: &NewIssue) -> CoreResult<Issue> {
        let mut issues = self.issues.write();
        let number = issues.len() as u64 + 1;
        let created = Issue {
            number,
            title: issue.title.clone(),
            url: format!("memory://issues/{}", number),
        };
        issues.push(StoredIssue {
            issue: created.clone(),
            body: issue.body.clone(),
            labels: issue.labels.clone(),
            comments: Vec::new(),
            open: true,
        });
        Ok(created)
    }

    async fn comment(&self, number: u64, body: &str) -> CoreResult<()> {
        self.update(number, |s| s.comments.push(body.to_string()))
    }

    async fn close(&self, number: u64) -> CoreResult<()> {
        self.update(number, |s| s.open = false)
    }
}
