//! # tfpipe_github
//!
//! GitHub integration for tfpipe through the `gh` CLI.
//!
//! - [`GhIssueTracker`] implements [`tfpipe_core::IssueTracker`] for the
//!   approval gate and drift reporter
//! - [`PrCommenter`] posts plan results on pull requests
//! - [`GhCli::verify_auth`] checks the token before anything is posted

pub mod error;
pub mod gh;
pub mod issues;
pub mod pr;

pub use error::{GithubError, GithubResult};
pub use gh::GhCli;
pub use issues::GhIssueTracker;
pub use pr::{plan_comment, PrCommenter, MAX_COMMENT_CHARS};
