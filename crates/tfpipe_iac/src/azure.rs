//! Azure CLI session checks.
//!
//! Terraform authenticates through the pre-authenticated Azure CLI
//! (`ARM_USE_CLI=true`), so a step verifies the session before running.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use tfpipe_runner::{CommandConfig, CommandRunner, RunConfig};

use crate::error::{IacError, IacResult};

const LOGIN_HINT: &str =
    "Run 'az login' or the azure/login action before this step so Terraform can use the CLI session";

/// Active Azure subscription as reported by `az account show`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureAccount {
    pub id: String,
    pub name: String,
    pub tenant_id: String,
    #[serde(default)]
    pub user: Option<AzureUser>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AzureUser {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Thin wrapper over the `az` binary.
pub struct AzureCli {
    runner: Arc<dyn CommandRunner>,
}

impl AzureCli {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Verify there is an active Azure CLI login.
    pub async fn verify_login(&self) -> IacResult<AzureAccount> {
        if !self.runner.is_available("az").await? {
            return Err(IacError::Authentication {
                tool: "Azure CLI".to_string(),
                message: "'az' was not found on PATH".to_string(),
                hint: LOGIN_HINT.to_string(),
            });
        }

        let config = CommandConfig::new("az").args(["account", "show", "--output", "json"]);
        let result = self.runner.run(&config, &RunConfig::default().timeout(60)).await?;

        if !result.success() {
            return Err(IacError::Authentication {
                tool: "Azure CLI".to_string(),
                message: result
                    .last_error_line()
                    .unwrap_or("no active account")
                    .to_string(),
                hint: LOGIN_HINT.to_string(),
            });
        }

        let account: AzureAccount =
            serde_json::from_str(&result.stdout).map_err(|e| IacError::UnexpectedOutput {
                tool: "az".to_string(),
                message: e.to_string(),
            })?;
        info!("Using Azure subscription {} ({})", account.name, account.id);
        Ok(account)
    }
}
