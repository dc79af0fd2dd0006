//! Plan summary extraction.
//!
//! Pulls the `Plan: N to add, N to change, N to destroy.` line (or the
//! "No changes." banner) out of plan or show output for comments and issues.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

fn plan_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"Plan: (?:(?P<import>\d+) to import, )?(?P<add>\d+) to add, (?P<change>\d+) to change, (?P<destroy>\d+) to destroy",
        )
        .expect("plan line pattern compiles")
    })
}

/// Resource counts of a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub import: u32,
    pub add: u32,
    pub change: u32,
    pub destroy: u32,
}

impl PlanSummary {
    /// Parse Terraform output. Returns `None` when neither a plan line nor a
    /// no-changes banner is present.
    pub fn parse(output: &str) -> Option<Self> {
        if let Some(caps) = plan_line_regex().captures(output) {
            let num = |name: &str| {
                caps.name(name)
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .unwrap_or(0)
            };
            return Some(Self {
                import: num("import"),
                add: num("add"),
                change: num("change"),
                destroy: num("destroy"),
            });
        }
        if output.contains("No changes.") {
            return Some(Self::default());
        }
        None
    }

    pub fn total(&self) -> u32 {
        self.import + self.add + self.change + self.destroy
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No changes.");
        }
        if self.import > 0 {
            write!(f, "Plan: {} to import, ", self.import)?;
        } else {
            write!(f, "Plan: ")?;
        }
        write!(
            f,
            "{} to add, {} to change, {} to destroy.",
            self.add, self.change, self.destroy
        )
    }
}
