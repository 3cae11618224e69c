// crates/vnet-harness-runner/src/report.rs
// ============================================================================
// Module: Run Reports
// Description: Per-tenant outcomes aggregated into a test verdict.
// Purpose: Report failures against `{test}/{tenant}` and persist summaries.
// Dependencies: serde, serde_jcs, time
// ============================================================================

//! ## Overview
//! A [`RunReport`] holds one [`UnitReport`] per tenant. A unit passes only
//! when its body passed and every cleanup step succeeded. Reports are
//! written as canonical JSON (`summary.json`) and Markdown (`summary.md`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::CleanupFailure;
use crate::error::HarnessError;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// How a unit's test body ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitOutcome {
    /// The body returned `Ok`.
    Passed,
    /// The body (or unit setup) returned an error.
    Failed {
        /// Error text.
        error: String,
    },
    /// The body panicked.
    Panicked {
        /// Panic payload text.
        message: String,
    },
    /// The body exceeded the unit timeout and was aborted.
    TimedOut {
        /// Timeout in seconds.
        after_secs: u64,
    },
}

impl fmt::Display for UnitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("passed"),
            Self::Failed {
                error,
            } => write!(f, "failed: {error}"),
            Self::Panicked {
                message,
            } => write!(f, "panicked: {message}"),
            Self::TimedOut {
                after_secs,
            } => write!(f, "timed out after {after_secs}s"),
        }
    }
}

/// Result of one tenant unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    /// Tenant name.
    pub tenant: String,
    /// Unique id (absent when resolution failed).
    pub unique_id: Option<String>,
    /// Resource group name (absent when resolution failed).
    pub resource_group: Option<String>,
    /// Body outcome.
    pub outcome: UnitOutcome,
    /// Wall time in milliseconds, cleanup included.
    pub duration_ms: u64,
    /// Cleanup steps that failed.
    pub cleanup_failures: Vec<CleanupFailure>,
}

impl UnitReport {
    /// Returns true when the body passed and cleanup was complete.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome == UnitOutcome::Passed && self.cleanup_failures.is_empty()
    }

    /// Returns one line per problem, prefixed with `{test}/{tenant}`.
    fn problem_lines(&self, test_name: &str) -> Vec<String> {
        let mut lines = Vec::new();
        if self.outcome != UnitOutcome::Passed {
            lines.push(format!("{test_name}/{}: {}", self.tenant, self.outcome));
        }
        lines.extend(
            self.cleanup_failures
                .iter()
                .map(|failure| format!("{test_name}/{}: {failure}", self.tenant)),
        );
        lines
    }
}

// ============================================================================
// SECTION: Run Report
// ============================================================================

/// Aggregated result of one multi-tenant test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Test name.
    pub test_name: String,
    /// RFC 3339 start time.
    pub started_at: String,
    /// Start time in Unix milliseconds.
    pub started_at_ms: u64,
    /// Unit reports in tenant order.
    pub units: Vec<UnitReport>,
}

impl RunReport {
    /// Starts an empty report stamped with the current time.
    #[must_use]
    pub fn start(test_name: &str) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            test_name: test_name.to_string(),
            started_at: now.format(&Rfc3339).unwrap_or_else(|_| now.unix_timestamp().to_string()),
            started_at_ms: u64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(0),
            units: Vec::new(),
        }
    }

    /// Returns true when at least one unit ran and every unit passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.units.is_empty() && self.units.iter().all(UnitReport::passed)
    }

    /// Returns the units that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|unit| !unit.passed())
    }

    /// Returns one line per problem across all units.
    #[must_use]
    pub fn problem_lines(&self) -> Vec<String> {
        if self.units.is_empty() {
            return vec![format!("{}: no tenant units ran", self.test_name)];
        }
        self.units.iter().flat_map(|unit| unit.problem_lines(&self.test_name)).collect()
    }

    /// Converts the report into the test verdict.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::RunFailed`] listing every failed unit.
    pub fn into_result(self) -> Result<Self, HarnessError> {
        if self.passed() {
            return Ok(self);
        }
        Err(HarnessError::RunFailed {
            test: self.test_name.clone(),
            failed: self.failures().count(),
            total: self.units.len(),
            summary: self.problem_lines().join("\n"),
        })
    }

    /// Renders the Markdown summary.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Multi-Tenant Test Summary\n\n");
        out.push_str(&format!("- Test: {}\n", self.test_name));
        out.push_str(&format!("- Started: {}\n", self.started_at));
        out.push_str(&format!("- Verdict: {}\n", if self.passed() { "passed" } else { "failed" }));
        out.push_str("\n## Tenants\n\n");
        out.push_str("| Tenant | Unique ID | Outcome | Duration (ms) | Cleanup |\n");
        out.push_str("|--------|-----------|---------|---------------|---------|\n");
        for unit in &self.units {
            let cleanup = if unit.cleanup_failures.is_empty() {
                "ok".to_string()
            } else {
                format!("{} failed", unit.cleanup_failures.len())
            };
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                unit.tenant,
                unit.unique_id.as_deref().unwrap_or("-"),
                unit.outcome,
                unit.duration_ms,
                cleanup
            ));
        }
        let problems: Vec<String> = self.failures().flat_map(|unit| unit.problem_lines(&self.test_name)).collect();
        out.push_str("\n## Problems\n\n");
        if problems.is_empty() {
            out.push_str("- None\n");
        } else {
            for line in problems {
                out.push_str(&format!("- {line}\n"));
            }
        }
        out
    }

    /// Writes `summary.json` and `summary.md` under
    /// `{run_root}/{test}/run_{started_at_ms}` and returns that directory.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Artifact`] when serialization or I/O fails.
    pub fn write_artifacts(&self, run_root: &Path) -> Result<PathBuf, HarnessError> {
        let dir = run_root
            .join(path_component(&self.test_name))
            .join(format!("run_{}", self.started_at_ms));
        fs::create_dir_all(&dir).map_err(|err| artifact_error("create run dir", &err))?;
        let json = serde_jcs::to_vec(self).map_err(|err| HarnessError::Artifact {
            context: "serialize summary",
            message: err.to_string(),
        })?;
        fs::write(dir.join("summary.json"), json)
            .map_err(|err| artifact_error("write summary.json", &err))?;
        fs::write(dir.join("summary.md"), self.to_markdown())
            .map_err(|err| artifact_error("write summary.md", &err))?;
        Ok(dir)
    }
}

/// Maps a test name to a single safe path component.
fn path_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') { ch } else { '_' })
        .collect();
    if cleaned.is_empty() { "unnamed".to_string() } else { cleaned }
}

/// Builds an artifact I/O error.
fn artifact_error(context: &'static str, err: &std::io::Error) -> HarnessError {
    HarnessError::Artifact {
        context,
        message: err.to_string(),
    }
}
