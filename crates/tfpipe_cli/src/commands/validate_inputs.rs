//! Validate-inputs command - Check step inputs before any tool runs.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use tfpipe_core::{Annotation, Validator};

use super::{Session, TargetArgs};

#[derive(Args, Debug)]
pub struct ValidateInputsArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Also require the environment's variable file
    #[arg(long)]
    pub require_var_file: bool,

    /// Variable file to require (defaults to <parameters>/<env>-variables.tfvars)
    #[arg(long, env = "TFPIPE_VAR_FILE")]
    pub var_file: Option<PathBuf>,

    /// Storage account name to check
    #[arg(long, env = "TFPIPE_STORAGE_ACCOUNT")]
    pub storage_account: Option<String>,

    /// Run id to check
    #[arg(long)]
    pub run_id: Option<String>,

    /// Additional files that must exist
    #[arg(long = "file")]
    pub files: Vec<PathBuf>,
}

pub async fn execute(args: ValidateInputsArgs, session: &Session) -> Result<()> {
    let mut v = Validator::new();
    let (environment, dir) = session.check_target(&args.target, &mut v);

    if args.require_var_file || args.var_file.is_some() {
        let var_file = args
            .var_file
            .clone()
            .unwrap_or_else(|| session.config.var_file(&environment));
        v.file("var-file", &var_file);
    }
    if let Some(account) = &args.storage_account {
        v.storage_account("storage-account", account);
    }
    if let Some(run_id) = &args.run_id {
        v.run_id("run-id", run_id);
    }
    for file in &args.files {
        v.file("file", file);
    }
    v.finish()?;

    info!("Inputs valid for {} in {:?}", environment, dir);
    Annotation::notice(format!("Inputs valid for environment '{}'", environment)).emit();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use tempfile::tempdir;
    use tfpipe_runner::MockRunner;

    fn args(environment: &str, dir: &std::path::Path) -> ValidateInputsArgs {
        ValidateInputsArgs {
            target: testing::target(environment, dir),
            require_var_file: false,
            var_file: None,
            storage_account: None,
            run_id: None,
            files: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_bang_environment_rejected() {
        let dir = tempdir().unwrap();
        let mock = MockRunner::new();
        let session = testing::session(&mock, dir.path());

        let err = execute(args("prod!", dir.path()), &session).await.unwrap_err();

        assert!(err.to_string().contains("environment"));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_var_file_named() {
        let dir = tempdir().unwrap();
        let mock = MockRunner::new();
        let session = testing::session(&mock, dir.path());

        let mut a = args("prod", dir.path());
        a.require_var_file = true;
        a.storage_account = Some("Not_Valid".to_string());
        let err = execute(a, &session).await.unwrap_err().to_string();

        assert!(err.contains("prod-variables.tfvars"));
        assert!(err.contains("does not exist"));
        assert!(err.contains("storage-account"));
    }

    #[tokio::test]
    async fn test_valid_inputs() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("parameters")).unwrap();
        std::fs::write(dir.path().join("parameters/dev-variables.tfvars"), "").unwrap();
        let mock = MockRunner::new();
        let session = testing::session(&mock, dir.path());

        let mut a = args("dev", dir.path());
        a.require_var_file = true;
        a.run_id = Some("12345".to_string());
        assert!(execute(a, &session).await.is_ok());
    }
}
