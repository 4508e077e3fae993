//! Compliance reports
//!
//! Serializes a run's findings into the JSON report consumed by external
//! approval workflows, plus a human-readable Markdown rendering. Reports are
//! pure output; paths inside them are repo-relative so nothing local leaks.

use crate::error::ReportError;
use crate::state::{load_json, utc_now_iso, write_json_atomic, LoadOutcome};
use crate::types::{Finding, RunStatus, Severity};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const REPORT_JSON: &str = "compliance_report.json";
pub const REPORT_MD: &str = "compliance_report.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub total: usize,
    pub error: usize,
    pub warn: usize,
}

/// One run's scan results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub generated_utc: String,
    pub status: RunStatus,
    pub counts: Counts,
    pub findings: Vec<Finding>,
    pub notes: String,
}

impl ComplianceReport {
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        let error = findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
            .count();
        let warn = findings
            .iter()
            .filter(|f| f.severity == Severity::Warn)
            .count();
        ComplianceReport {
            generated_utc: utc_now_iso(),
            status: RunStatus::from_counts(error, warn),
            counts: Counts {
                total: findings.len(),
                error,
                warn,
            },
            findings,
            notes: "Automated scan; indicates risk signals only.".to_string(),
        }
    }

    /// Exit-code contract: 2 on ERROR findings, 1 on WARN findings under
    /// strict mode, 0 otherwise.
    pub fn exit_code(&self, strict: bool) -> i32 {
        if self.counts.error > 0 {
            2
        } else if strict && self.counts.warn > 0 {
            1
        } else {
            0
        }
    }
}

/// Write both report renderings under `report_dir`, atomically.
pub fn write_reports(report_dir: &Path, report: &ComplianceReport) -> Result<(), ReportError> {
    let json_path = report_dir.join(REPORT_JSON);
    write_json_atomic(&json_path, report).map_err(|e| ReportError::Write {
        path: json_path,
        source: e,
    })?;

    let md_path = report_dir.join(REPORT_MD);
    std::fs::create_dir_all(report_dir).map_err(|e| ReportError::Write {
        path: md_path.clone(),
        source: e,
    })?;
    std::fs::write(&md_path, render_markdown(report)).map_err(|e| ReportError::Write {
        path: md_path,
        source: e,
    })
}

/// Load the last written report, fail-open like the other persisted files.
pub fn load_report(report_dir: &Path) -> LoadOutcome<ComplianceReport> {
    load_json(&report_dir.join(REPORT_JSON))
}

pub fn render_markdown(report: &ComplianceReport) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("# Repository Compliance Report".to_string());
    lines.push(String::new());
    lines.push(format!("- Generated (UTC): `{}`", report.generated_utc));
    lines.push("- Repository root: (omitted)".to_string());
    lines.push(format!("- Status: **{}**", report.status.as_str()));
    lines.push(format!(
        "- Findings: {} (ERROR={}, WARN={})",
        report.counts.total, report.counts.error, report.counts.warn
    ));
    lines.push(String::new());
    lines.push("## Findings".to_string());
    lines.push(String::new());

    if report.findings.is_empty() {
        lines.push("No findings. [OK]".to_string());
    } else {
        for f in &report.findings {
            lines.push(format!(
                "- [{}] `{}` - {}",
                f.severity.as_str(),
                f.path,
                f.message
            ));
            if let Some(hint) = &f.hint {
                lines.push(format!("  - hint: {hint}"));
            }
        }
    }

    lines.push(String::new());
    lines.join("\n")
}
