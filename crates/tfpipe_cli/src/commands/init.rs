//! Init command - Initialise Terraform against the state backend.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::info;

use tfpipe_core::{Annotation, LocalBackend, StateBackend, Validator};
use tfpipe_iac::{AzureBlobBackend, AzureCli};

use super::{Session, TargetArgs};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Azure blob storage when a storage account is configured, else local
    #[default]
    Auto,
    Azurerm,
    Local,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// State backend
    #[arg(long, value_enum, default_value_t = BackendKind::Auto)]
    pub backend: BackendKind,

    /// Storage account holding the state
    #[arg(long, env = "TFPIPE_STORAGE_ACCOUNT")]
    pub storage_account: Option<String>,

    /// Blob container holding the state
    #[arg(long, env = "TFPIPE_STATE_CONTAINER")]
    pub container: Option<String>,

    /// Resource group of the storage account
    #[arg(long, env = "TFPIPE_RESOURCE_GROUP")]
    pub resource_group: Option<String>,

    /// State blob name (defaults to <env>.tfstate)
    #[arg(long)]
    pub state_key: Option<String>,

    /// Pass -reconfigure to terraform init
    #[arg(long)]
    pub reconfigure: bool,

    /// Skip the `az account show` login check
    #[arg(long)]
    pub skip_auth_check: bool,
}

/// Backend for the step, with command-line settings over configured ones.
fn select_backend(args: &InitArgs, session: &Session, v: &mut Validator) -> Box<dyn StateBackend> {
    let mut settings = session.config.backend.clone();
    if let Some(account) = &args.storage_account {
        settings.storage_account = Some(account.clone());
    }
    if let Some(container) = &args.container {
        settings.container = container.clone();
    }
    if let Some(rg) = &args.resource_group {
        settings.resource_group = Some(rg.clone());
    }

    let azure = AzureBlobBackend::from_settings(&settings, &args.target.environment).map(|b| {
        match &args.state_key {
            Some(key) => AzureBlobBackend { key: key.clone(), ..b },
            None => b,
        }
    });

    match (args.backend, azure) {
        (BackendKind::Local, _) | (BackendKind::Auto, None) => Box::new(LocalBackend::new()),
        (_, Some(backend)) => Box::new(backend),
        (BackendKind::Azurerm, None) => {
            v.require(
                "storage-account",
                false,
                "a storage account is required for the azurerm backend",
            );
            Box::new(LocalBackend::new())
        }
    }
}

pub async fn execute(args: InitArgs, session: &Session) -> Result<()> {
    let mut v = Validator::new();
    let (environment, dir) = session.check_target(&args.target, &mut v);
    let backend = select_backend(&args, session, &mut v);
    backend.validate(&mut v);
    v.finish()?;

    if backend.kind() == "azurerm" && !args.skip_auth_check && !session.dry_run {
        AzureCli::new(session.runner.clone())
            .verify_login()
            .await
            .context("Azure authentication check failed")?;
    }

    session
        .terraform()
        .init(&dir, backend.as_ref(), args.reconfigure)
        .await?
        .into_checked()?;

    info!("Initialised {} with the {} backend", environment, backend.kind());
    session.outputs.set("backend", backend.kind())?;
    Annotation::notice(format!(
        "Terraform initialised for '{}' ({} backend)",
        environment,
        backend.kind()
    ))
    .emit();
    Ok(())
}
