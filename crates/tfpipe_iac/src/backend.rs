//! Azure blob storage state backend.
//!
//! Locking and lease handling belong to the azurerm backend itself; this type
//! only renders the `-backend-config` arguments for `terraform init`.

use tfpipe_core::{BackendSettings, StateBackend, Validator};

/// `azurerm` backend settings for one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureBlobBackend {
    pub storage_account: String,
    pub container: String,
    pub resource_group: Option<String>,
    pub key: String,
}

impl AzureBlobBackend {
    pub fn new(storage_account: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            storage_account: storage_account.into(),
            container: "tfstate".to_string(),
            resource_group: None,
            key: key.into(),
        }
    }

    /// Build from pipeline settings, or `None` when no storage account is set.
    pub fn from_settings(settings: &BackendSettings, environment: &str) -> Option<Self> {
        let storage_account = settings.storage_account.clone()?;
        Some(Self {
            storage_account,
            container: settings.container.clone(),
            resource_group: settings.resource_group.clone(),
            key: settings.state_key(environment),
        })
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn with_resource_group(mut self, resource_group: impl Into<String>) -> Self {
        self.resource_group = Some(resource_group.into());
        self
    }
}

impl StateBackend for AzureBlobBackend {
    fn kind(&self) -> &'static str {
        "azurerm"
    }

    fn init_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("-backend-config=storage_account_name={}", self.storage_account),
            format!("-backend-config=container_name={}", self.container),
            format!("-backend-config=key={}", self.key),
        ];
        if let Some(rg) = &self.resource_group {
            args.push(format!("-backend-config=resource_group_name={}", rg));
        }
        args
    }

    fn validate(&self, validator: &mut Validator) {
        validator
            .storage_account("storage-account", &self.storage_account)
            .non_empty("container", &self.container)
            .non_empty("state-key", &self.key);
        if let Some(rg) = &self.resource_group {
            validator.non_empty("resource-group", rg);
        }
    }
}
