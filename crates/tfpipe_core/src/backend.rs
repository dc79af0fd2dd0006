//! Terraform state backend capability.
//!
//! State and its locking belong to Terraform and the remote backend. A
//! backend here only knows how to describe itself to `terraform init`.

use std::path::PathBuf;

use crate::validate::Validator;

/// Where Terraform keeps state for an environment.
#[cfg_attr(test, mockall::automock)]
pub trait StateBackend: Send + Sync {
    /// Backend type as named in the Terraform configuration.
    fn kind(&self) -> &'static str;

    /// Arguments appended to `terraform init`.
    fn init_args(&self) -> Vec<String>;

    /// Check backend settings before any tool runs.
    fn validate(&self, validator: &mut Validator);
}

/// Local state file, used for development and tests.
#[derive(Debug, Clone, Default)]
pub struct LocalBackend {
    pub path: Option<PathBuf>,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

impl StateBackend for LocalBackend {
    fn kind(&self) -> &'static str {
        "local"
    }

    fn init_args(&self) -> Vec<String> {
        match &self.path {
            Some(path) => vec![format!("-backend-config=path={}", path.display())],
            None => Vec::new(),
        }
    }

    fn validate(&self, _validator: &mut Validator) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_backend_args() {
        assert!(LocalBackend::new().init_args().is_empty());
        assert_eq!(
            LocalBackend::with_path("state/dev.tfstate").init_args(),
            vec!["-backend-config=path=state/dev.tfstate".to_string()]
        );
    }

    #[test]
    fn test_backend_trait_object_is_mockable() {
        let mut backend = MockStateBackend::new();
        backend.expect_kind().return_const("azurerm");
        backend
            .expect_init_args()
            .returning(|| vec!["-backend-config=key=prod.tfstate".to_string()]);

        let dyn_backend: &dyn StateBackend = &backend;
        assert_eq!(dyn_backend.kind(), "azurerm");
        assert_eq!(dyn_backend.init_args().len(), 1);
    }
}
