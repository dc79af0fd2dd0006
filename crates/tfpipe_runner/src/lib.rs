//! # tfpipe_runner
//!
//! External command execution layer for tfpipe.
//!
//! Every pipeline step shells out to an already-robust tool (`terraform`,
//! `az`, `gh`). This crate owns how those processes are spawned, how their
//! output is captured, and how a step can be exercised without the tools
//! installed.
//!
//! # Features
//!
//! - **Process Runner**: tokio-backed spawning with captured stdout/stderr
//! - **Dry-Run Mode**: Log commands without executing them
//! - **CI Integration**: Streamed log lines with timestamps under `CI`
//! - **Mock Runner**: Scripted responses and call capture for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use tfpipe_runner::{CommandConfig, CommandRunner, ProcessRunner, ProcessRunnerOptions, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = ProcessRunner::new(ProcessRunnerOptions::default());
//!
//!     let config = CommandConfig::new("terraform")
//!         .arg("version")
//!         .env("TF_IN_AUTOMATION", "true");
//!
//!     let result = runner.run(&config, &RunConfig::default()).await?;
//!     println!("Exit code: {}", result.exit_code);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mock;
pub mod process;
pub mod runner;

pub use config::{CommandConfig, RunConfig};
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use process::{LogLine, LogStream, ProcessRunner, ProcessRunnerOptions};
pub use runner::{last_output_line, CommandRunner, ExecutionResult};
