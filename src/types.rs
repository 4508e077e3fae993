//! Shared vocabulary for scanner findings and run outcomes.

use serde::{Deserialize, Serialize};

/// Finding severity, strictly ordered for aggregation (`Info < Warn < Error`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

/// Aggregate outcome of a whole scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Pass,
    Warn,
    Fail,
}

impl RunStatus {
    /// Aggregation rule: any ERROR fails the run, else any WARN, else PASS.
    pub fn from_counts(error_count: usize, warn_count: usize) -> Self {
        if error_count > 0 {
            RunStatus::Fail
        } else if warn_count > 0 {
            RunStatus::Warn
        } else {
            RunStatus::Pass
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pass => "PASS",
            RunStatus::Warn => "WARN",
            RunStatus::Fail => "FAIL",
        }
    }
}

/// One scanner observation. Findings are pure output; they are serialized
/// into a report for a run but never persisted as entities themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    /// Repo-relative POSIX path.
    pub path: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl Finding {
    pub fn new(
        severity: Severity,
        path: impl Into<String>,
        message: impl Into<String>,
        hint: Option<&str>,
    ) -> Self {
        Finding {
            severity,
            path: path.into(),
            message: message.into(),
            hint: hint.map(|h| h.to_string()),
        }
    }
}
