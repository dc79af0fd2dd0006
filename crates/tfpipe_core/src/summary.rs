//! Pipeline summary rendering.

use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Result of one pipeline stage, as reported by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Success,
    Failure,
    Cancelled,
    Skipped,
}

impl StageStatus {
    pub fn icon(&self) -> &'static str {
        match self {
            StageStatus::Success => "✅",
            StageStatus::Failure => "❌",
            StageStatus::Cancelled => "🚫",
            StageStatus::Skipped => "⏭️",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Success => "success",
            StageStatus::Failure => "failure",
            StageStatus::Cancelled => "cancelled",
            StageStatus::Skipped => "skipped",
        }
    }
}

impl FromStr for StageStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "success" => Ok(StageStatus::Success),
            "failure" => Ok(StageStatus::Failure),
            "cancelled" => Ok(StageStatus::Cancelled),
            "skipped" | "" => Ok(StageStatus::Skipped),
            other => Err(CoreError::Config(format!("unknown stage result '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: String,
    pub status: StageStatus,
}

impl FromStr for StageResult {
    type Err = CoreError;

    /// Parse `stage=result`, e.g. `plan=success`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (stage, status) = s
            .split_once('=')
            .ok_or_else(|| CoreError::Config(format!("expected stage=result, got '{}'", s)))?;
        if stage.trim().is_empty() {
            return Err(CoreError::Config(format!("missing stage name in '{}'", s)));
        }
        Ok(Self {
            stage: stage.trim().to_string(),
            status: status.parse()?,
        })
    }
}

/// Markdown summary of a deployment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub environment: String,
    pub deployment_id: String,
    pub plan_exit_code: Option<i32>,
    pub stages: Vec<StageResult>,
}

impl PipelineSummary {
    pub fn new(environment: impl Into<String>, deployment_id: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            deployment_id: deployment_id.into(),
            plan_exit_code: None,
            stages: Vec::new(),
        }
    }

    pub fn with_plan_exit_code(mut self, code: i32) -> Self {
        self.plan_exit_code = Some(code);
        self
    }

    pub fn add_stage(&mut self, stage: StageResult) {
        self.stages.push(stage);
    }

    /// Failed when any stage failed or was cancelled.
    pub fn passed(&self) -> bool {
        !self
            .stages
            .iter()
            .any(|s| matches!(s.status, StageStatus::Failure | StageStatus::Cancelled))
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let _ = writeln!(md, "## Terraform deployment: {}", self.environment);
        let _ = writeln!(md);
        let _ = writeln!(md, "Deployment: `{}`", self.deployment_id);
        if let Some(code) = self.plan_exit_code {
            let outcome = crate::outcome::PlanOutcome::from_exit_code(code);
            let _ = writeln!(md, "Plan result: `{}` (exit code {})", outcome, code);
        }
        let _ = writeln!(md);
        let _ = writeln!(md, "| Stage | Result |");
        let _ = writeln!(md, "|-------|--------|");
        for stage in &self.stages {
            let _ = writeln!(
                md,
                "| {} | {} {} |",
                stage.stage,
                stage.status.icon(),
                stage.status.as_str()
            );
        }
        let _ = writeln!(md);
        if self.passed() {
            let _ = writeln!(md, "**Overall: ✅ passed**");
        } else {
            let _ = writeln!(md, "**Overall: ❌ failed**");
        }
        md
    }
}
