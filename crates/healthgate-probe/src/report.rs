//! Reporting: CI outputs, step summary, and human-readable formatting.
//!
//! The reporter is invoked once with the final [`CheckOutcome`]. Nothing
//! else in the crate writes outside the network call.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ReportError;
use crate::result::Outcome;
use crate::retry::CheckOutcome;

/// Environment variable naming the CI outputs file.
pub const OUTPUT_ENV: &str = "GITHUB_OUTPUT";
/// Environment variable naming the CI step summary file.
pub const SUMMARY_ENV: &str = "GITHUB_STEP_SUMMARY";

/// The three named outputs handed to the CI host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outputs {
    /// `healthy` or `unhealthy`.
    pub status: String,
    /// Milliseconds of the final attempt, as a string.
    pub response_time: String,
    /// Pretty JSON of the final result.
    pub details: String,
}

impl Outputs {
    pub fn from_outcome(outcome: &CheckOutcome) -> Result<Self, ReportError> {
        Ok(Self {
            status: outcome.result.outcome.as_str().to_string(),
            response_time: outcome.result.response_time_ms.to_string(),
            details: serde_json::to_string_pretty(&outcome.result)?,
        })
    }

    /// `(name, value)` pairs in output order.
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("status", self.status.as_str()),
            ("response-time", self.response_time.as_str()),
            ("details", self.details.as_str()),
        ]
    }
}

/// Writes outputs and the step summary to the files the CI host provides.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    output_path: Option<PathBuf>,
    summary_path: Option<PathBuf>,
}

impl Reporter {
    pub fn new(output_path: Option<PathBuf>, summary_path: Option<PathBuf>) -> Self {
        Self {
            output_path,
            summary_path,
        }
    }

    /// Pick up `GITHUB_OUTPUT` and `GITHUB_STEP_SUMMARY` when set.
    pub fn from_env() -> Self {
        let path = |key: &str| {
            std::env::var_os(key)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        Self::new(path(OUTPUT_ENV), path(SUMMARY_ENV))
    }

    /// Whether any CI file is configured.
    pub fn is_attached(&self) -> bool {
        self.output_path.is_some() || self.summary_path.is_some()
    }

    /// Emit outputs and the step summary for the final outcome.
    pub fn write(&self, outcome: &CheckOutcome) -> Result<(), ReportError> {
        if let Some(path) = &self.output_path {
            let outputs = Outputs::from_outcome(outcome)?;
            let mut content = String::new();
            for (name, value) in outputs.pairs() {
                content.push_str(&format_output(name, value));
            }
            append(path, &content)?;
            debug!(path = %path.display(), "wrote check outputs");
        }

        if let Some(path) = &self.summary_path {
            append(path, &format_markdown_summary(outcome))?;
            debug!(path = %path.display(), "wrote step summary");
        }

        Ok(())
    }
}

fn append(path: &Path, content: &str) -> Result<(), ReportError> {
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    file.write_all(content.as_bytes()).map_err(io_err)
}

/// One output in the multi-line `name<<DELIM` file format.
fn format_output(name: &str, value: &str) -> String {
    let mut delimiter = String::from("HEALTHGATE_EOF");
    while value.contains(&delimiter) {
        delimiter.push('_');
    }
    format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
}

fn status_code_label(outcome: &CheckOutcome) -> String {
    outcome
        .result
        .status_code
        .map_or_else(|| "N/A".to_string(), |c| c.to_string())
}

/// Markdown table for the CI step summary.
pub fn format_markdown_summary(outcome: &CheckOutcome) -> String {
    let result = &outcome.result;
    let label = match result.outcome {
        Outcome::Healthy => "✅ Healthy",
        Outcome::Unhealthy => "❌ Unhealthy",
    };

    let mut out = String::new();
    out.push_str("## 🏥 Health Check Results\n\n");
    out.push_str("| URL | Status | Response Time | Status Code | Attempts |\n");
    out.push_str("| --- | --- | --- | --- | --- |\n");
    let _ = writeln!(
        out,
        "| {} | {label} | {}ms | {} | {} |",
        result.url,
        result.response_time_ms,
        status_code_label(outcome),
        outcome.attempts,
    );

    if result.outcome == Outcome::Unhealthy {
        let _ = write!(out, "\n**Error Details:**\n```\n{}\n```\n", result.message);
    }

    out
}

/// Human-readable summary for an operator's terminal.
pub fn format_summary(outcome: &CheckOutcome) -> String {
    let result = &outcome.result;
    let verdict = match result.outcome {
        Outcome::Healthy => "✅ healthy",
        Outcome::Unhealthy => "❌ unhealthy",
    };

    let mut out = String::new();
    out.push_str("\n╔══════════════════════════════════════════╗\n");
    out.push_str("║  Health Check Results                    ║\n");
    out.push_str("╚══════════════════════════════════════════╝\n\n");
    let _ = writeln!(out, "  Target:        {}", result.url);
    let _ = writeln!(out, "  Status:        {verdict}");
    let _ = writeln!(out, "  Response time: {}ms", result.response_time_ms);
    let _ = writeln!(out, "  Status code:   {}", status_code_label(outcome));
    let _ = writeln!(out, "  Attempts:      {}", outcome.attempts);

    if !result.is_healthy() {
        let _ = writeln!(out, "\n  {}", result.message);
        if let Some(error) = &result.error {
            let _ = writeln!(out, "  Error: {error}");
        }
    }

    out
}
