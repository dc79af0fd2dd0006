//! Step outputs and job summaries.
//!
//! Outputs go to the file named by `GITHUB_OUTPUT` so later steps can read
//! them as `steps.<id>.outputs.<name>`. Outside Actions they print to stdout.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use tracing::debug;

use crate::error::CoreResult;

const DELIMITER: &str = "TFPIPE_EOF";

/// Writer for named step outputs.
#[derive(Debug, Clone, Default)]
pub struct StepOutputs {
    path: Option<PathBuf>,
}

impl StepOutputs {
    pub fn from_env() -> Self {
        Self {
            path: std::env::var_os("GITHUB_OUTPUT").map(PathBuf::from),
        }
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn stdout() -> Self {
        Self { path: None }
    }

    /// Render one output entry, using heredoc form for multi-line values.
    pub fn render(name: &str, value: &str) -> String {
        if !value.contains('\n') {
            return format!("{}={}\n", name, value);
        }
        let mut delimiter = DELIMITER.to_string();
        while value.contains(&delimiter) {
            delimiter.push('_');
        }
        format!("{}<<{}\n{}\n{}\n", name, delimiter, value.trim_end_matches('\n'), delimiter)
    }

    pub fn set(&self, name: &str, value: &str) -> CoreResult<()> {
        let entry = Self::render(name, value);
        match &self.path {
            Some(path) => {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                file.write_all(entry.as_bytes())?;
                debug!("Set output {}", name);
            }
            None => print!("{}", entry),
        }
        Ok(())
    }
}

/// Appender for the Markdown job summary (`GITHUB_STEP_SUMMARY`).
#[derive(Debug, Clone, Default)]
pub struct StepSummary {
    path: Option<PathBuf>,
}

impl StepSummary {
    pub fn from_env() -> Self {
        Self {
            path: std::env::var_os("GITHUB_STEP_SUMMARY").map(PathBuf::from),
        }
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Append Markdown. Without a summary file this is a no-op.
    pub fn append(&self, markdown: &str) -> CoreResult<()> {
        if let Some(path) = &self.path {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(file, "{}", markdown)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_single_line_output() {
        assert_eq!(StepOutputs::render("exitcode", "2"), "exitcode=2\n");
    }

    #[test]
    fn test_multiline_output_uses_heredoc() {
        let rendered = StepOutputs::render("summary", "line one\nline two\n");
        assert_eq!(rendered, "summary<<TFPIPE_EOF\nline one\nline two\nTFPIPE_EOF\n");
    }

    #[test]
    fn test_delimiter_avoids_collision() {
        let rendered = StepOutputs::render("summary", "a\nTFPIPE_EOF\nb");
        assert!(rendered.starts_with("summary<<TFPIPE_EOF_\n"));
        assert!(rendered.ends_with("\nTFPIPE_EOF_\n"));
    }

    #[test]
    fn test_outputs_append_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output");
        let outputs = StepOutputs::to_file(&path);

        outputs.set("exitcode", "0").unwrap();
        outputs.set("artifact", "tfplan-dev-1").unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, "exitcode=0\nartifact=tfplan-dev-1\n");
    }

    #[test]
    fn test_summary_without_file_is_noop() {
        assert!(StepSummary::default().append("# hello").is_ok());
    }
}
