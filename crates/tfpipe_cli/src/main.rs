//! tfpipe CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Any failure (validation, Terraform error, authentication, artifact)
//! - 2: Plan with changes, only with `plan --detailed-exitcode`

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tfpipe_core::Annotation;

mod commands;

use commands::{Cli, Commands, Session};

/// CI-facing exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const FAILURE: u8 = 1;
    pub const CHANGES_PRESENT: u8 = 2;
}

fn init_logging(verbose: bool, quiet: bool, json: bool) {
    let default_directives = if verbose {
        "tfpipe=debug,info"
    } else if quiet {
        "warn"
    } else {
        "tfpipe=info,warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    // stdout carries workflow commands; logs go to stderr.
    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
}

async fn run(command: Commands, session: &Session) -> anyhow::Result<u8> {
    let ok = |()| ExitCodes::SUCCESS;
    match command {
        Commands::ValidateInputs(args) => commands::validate_inputs::execute(args, session).await.map(ok),
        Commands::Init(args) => commands::init::execute(args, session).await.map(ok),
        Commands::Validate(args) => commands::validate::execute(args, session).await.map(ok),
        Commands::Fmt(args) => commands::fmt::execute(args, session).await.map(ok),
        Commands::Plan(args) => {
            let detailed = args.detailed_exitcode;
            let outcome = commands::plan::execute(args, session).await?;
            Ok(if detailed && outcome.has_changes() {
                ExitCodes::CHANGES_PRESENT
            } else {
                ExitCodes::SUCCESS
            })
        }
        Commands::Apply(args) => commands::apply::execute(args, session).await.map(ok),
        Commands::Destroy(args) => commands::destroy::execute(args, session).await.map(ok),
        Commands::Publish(args) => commands::publish::execute(args, session).await.map(ok),
        Commands::Download(args) => commands::download::execute(args, session).await.map(ok),
        Commands::Approval(args) => commands::approval::execute(args, session).await.map(ok),
        Commands::Drift(args) => commands::drift::execute(args, session).await.map(ok),
        Commands::Comment(args) => commands::comment::execute(args, session).await.map(ok),
        Commands::Summary(args) => commands::summary::execute(args, session).await.map(ok),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose, cli.global.quiet, cli.global.log_json);

    let step = cli.command.name();
    let result = match Session::from_globals(&cli.global) {
        Ok(session) => run(cli.command, &session).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            // One annotation per failure, carrying the most specific message.
            Annotation::error(format!("{:#}", e))
                .with_title(format!("tfpipe {}", step))
                .emit();
            ExitCode::from(ExitCodes::FAILURE)
        }
    }
}
