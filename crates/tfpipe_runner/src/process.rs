//! Host process runner.
//!
//! Spawns programs directly on the CI host with tokio, capturing stdout and
//! stderr while optionally echoing each line as it arrives.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::{CommandConfig, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandRunner, ExecutionResult};

/// Log output from a running command.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub timestamp: chrono::DateTime<Utc>,
    pub stream: LogStream,
    pub message: String,
}

/// Log stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// Process runner options.
#[derive(Debug, Clone)]
pub struct ProcessRunnerOptions {
    /// Dry-run mode (log commands without executing)
    pub dry_run: bool,
    /// CI mode (timestamped log lines)
    pub ci_mode: bool,
}

impl Default for ProcessRunnerOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            ci_mode: std::env::var("CI").is_ok(),
        }
    }
}

impl ProcessRunnerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn ci_mode(mut self) -> Self {
        self.ci_mode = true;
        self
    }
}

/// Runs commands as child processes of the current job.
pub struct ProcessRunner {
    options: ProcessRunnerOptions,
}

impl ProcessRunner {
    pub fn new(options: ProcessRunnerOptions) -> Self {
        Self { options }
    }

    /// Check if dry-run mode is enabled.
    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    fn build_command(&self, config: &CommandConfig) -> Command {
        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args);
        if let Some(dir) = &config.workdir {
            cmd.current_dir(dir);
        }
        cmd.envs(&config.env);
        cmd.stdin(if config.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }

    fn collect<R>(&self, reader: R, stream: LogStream, echo: bool) -> tokio::task::JoinHandle<String>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let ci_mode = self.options.ci_mode;
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            let mut output = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                output.push_str(&line);
                output.push('\n');
                if !echo {
                    continue;
                }
                let log_line = LogLine {
                    timestamp: Utc::now(),
                    stream,
                    message: line,
                };
                if ci_mode {
                    println!(
                        "[{}] [{}] {}",
                        log_line.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                        log_line.stream,
                        log_line.message
                    );
                } else {
                    match stream {
                        LogStream::Stdout => println!("{}", log_line.message),
                        LogStream::Stderr => eprintln!("{}", log_line.message),
                    }
                }
            }
            output
        })
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn is_available(&self, program: &str) -> RunnerResult<bool> {
        let status = Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        Ok(status.map(|s| s.success()).unwrap_or(false))
    }

    async fn run(
        &self,
        config: &CommandConfig,
        run_config: &RunConfig,
    ) -> RunnerResult<ExecutionResult> {
        let cmd_str = config.display();

        if self.options.dry_run {
            info!("[DRY-RUN] Would execute: {}", cmd_str);
            let now = Utc::now();
            return Ok(ExecutionResult {
                program: config.program.clone(),
                exit_code: 0,
                stdout: format!("[DRY-RUN] Command: {}", cmd_str),
                stderr: String::new(),
                started_at: now,
                finished_at: now,
                duration_ms: 0,
            });
        }

        debug!("Executing: {}", cmd_str);

        let started_at = Utc::now();
        let mut child = self
            .build_command(config)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RunnerError::ProgramNotAvailable(config.program.clone()),
                _ => RunnerError::SpawnFailed {
                    program: config.program.clone(),
                    reason: e.to_string(),
                },
            })?;

        if let (Some(input), Some(mut stdin)) = (&config.stdin, child.stdin.take()) {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stderr not captured".to_string()))?;

        let stdout_handle = self.collect(stdout, LogStream::Stdout, run_config.stream_logs);
        let stderr_handle = self.collect(stderr, LogStream::Stderr, run_config.stream_logs);

        let status = if run_config.timeout_seconds > 0 {
            let limit = Duration::from_secs(run_config.timeout_seconds);
            let waited = tokio::time::timeout(limit, child.wait()).await;
            match waited {
                Ok(status) => status?,
                Err(_) => {
                    warn!("{} exceeded {}s, killing", config.program, run_config.timeout_seconds);
                    let _ = child.kill().await;
                    return Err(RunnerError::Timeout(run_config.timeout_seconds));
                }
            }
        } else {
            child.wait().await?
        };

        let stdout_output = stdout_handle.await.unwrap_or_default();
        let stderr_output = stderr_handle.await.unwrap_or_default();
        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        let exit_code = status.code().unwrap_or(-1);
        debug!(
            "{} exited with code {} after {}ms",
            config.program, exit_code, duration_ms
        );

        Ok(ExecutionResult {
            program: config.program.clone(),
            exit_code,
            stdout: stdout_output,
            stderr: stderr_output,
            started_at,
            finished_at,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_mode() {
        let runner = ProcessRunner::new(ProcessRunnerOptions::new().dry_run());
        assert!(runner.is_dry_run());
    }

    #[test]
    fn test_ci_mode_option() {
        let options = ProcessRunnerOptions::new().ci_mode();
        assert!(options.ci_mode);
    }

    #[tokio::test]
    async fn test_dry_run_does_not_spawn() {
        let runner = ProcessRunner::new(ProcessRunnerOptions::new().dry_run());
        let config = CommandConfig::new("definitely-not-a-real-program").arg("plan");

        let result = runner.run(&config, &RunConfig::default()).await.unwrap();

        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("definitely-not-a-real-program plan"));
    }

    #[tokio::test]
    async fn test_missing_program_is_not_available() {
        let runner = ProcessRunner::new(ProcessRunnerOptions::default());
        let config = CommandConfig::new("definitely-not-a-real-program");

        let err = runner.run(&config, &RunConfig::default()).await.unwrap_err();
        assert!(matches!(err, RunnerError::ProgramNotAvailable(ref p) if p == "definitely-not-a-real-program"));
        assert!(err.to_string().contains("not found on PATH"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unexecutable_file_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("not-executable.sh");
        std::fs::write(&script, "#!/bin/sh\necho hi\n").unwrap();
        let runner = ProcessRunner::new(ProcessRunnerOptions::default());
        let config = CommandConfig::new(script.to_string_lossy());

        let err = runner.run(&config, &RunConfig::default()).await.unwrap_err();
        assert!(matches!(err, RunnerError::SpawnFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code_is_returned_verbatim() {
        let runner = ProcessRunner::new(ProcessRunnerOptions::default());
        let config = CommandConfig::new("sh").args(["-c", "echo planned; echo oops >&2; exit 2"]);

        let result = runner.run(&config, &RunConfig::default()).await.unwrap();

        assert_eq!(result.exit_code, 2);
        assert_eq!(result.stdout, "planned\n");
        assert_eq!(result.stderr, "oops\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdin_is_forwarded() {
        let runner = ProcessRunner::new(ProcessRunnerOptions::default());
        let config = CommandConfig::new("cat").stdin("comment body");

        let result = runner.run(&config, &RunConfig::default()).await.unwrap();

        assert!(result.success());
        assert_eq!(result.stdout, "comment body\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_workdir_and_env_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.tf"), "").unwrap();
        let runner = ProcessRunner::new(ProcessRunnerOptions::default());
        let config = CommandConfig::new("sh")
            .args(["-c", "ls; echo $TF_IN_AUTOMATION"])
            .workdir(dir.path())
            .env("TF_IN_AUTOMATION", "true");

        let result = runner.run(&config, &RunConfig::default()).await.unwrap();

        assert_eq!(result.stdout, "main.tf\ntrue\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let runner = ProcessRunner::new(ProcessRunnerOptions::default());
        let config = CommandConfig::new("sleep").arg("5");

        let err = runner
            .run(&config, &RunConfig::default().timeout(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Timeout(1)));
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let runner = ProcessRunner::new(ProcessRunnerOptions::default());
        assert!(!runner
            .is_available("definitely-not-a-real-program")
            .await
            .unwrap());
    }
}
