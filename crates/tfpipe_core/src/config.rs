//! Pipeline configuration.
//!
//! Values come from an optional `tfpipe.yaml`; command-line flags and
//! environment variables override them in the CLI.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::artifact::var_file_name;
use crate::error::{CoreError, CoreResult};

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "tfpipe.yaml";

/// Azure blob backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub storage_account: Option<String>,
    pub container: String,
    pub resource_group: Option<String>,
    /// State key; `{environment}` is substituted
    pub key_template: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            storage_account: None,
            container: "tfstate".to_string(),
            resource_group: None,
            key_template: "{environment}.tfstate".to_string(),
        }
    }
}

impl BackendSettings {
    pub fn state_key(&self, environment: &str) -> String {
        self.key_template.replace("{environment}", environment)
    }
}

/// Pipeline-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the Terraform root module
    pub working_directory: PathBuf,
    /// Directory holding `{environment}-variables.tfvars` files
    pub parameters_directory: PathBuf,
    /// Staging directory for plan artifacts
    pub artifact_directory: PathBuf,
    pub backend: BackendSettings,
    /// Labels added to every issue besides the fixed ones
    pub extra_labels: Vec<String>,
    /// Timeout for a single Terraform command (0 = none)
    pub terraform_timeout_seconds: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            working_directory: PathBuf::from("."),
            parameters_directory: PathBuf::from("parameters"),
            artifact_directory: PathBuf::from(".tfpipe/artifacts"),
            backend: BackendSettings::default(),
            extra_labels: Vec::new(),
            terraform_timeout_seconds: 0,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load an explicit file, or `tfpipe.yaml` if present, or defaults.
    pub fn discover(explicit: Option<&Path>) -> CoreResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.is_file() {
            return Self::load(default_path);
        }
        debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
        Ok(Self::default())
    }

    /// Variable file for an environment.
    pub fn var_file(&self, environment: &str) -> PathBuf {
        self.parameters_directory.join(var_file_name(environment))
    }
}
