//! Rule Engine / Scanner
//!
//! Best-effort, conservative scan of a repository tree for public-sharing
//! risk signals: academic-integrity leakage, PII (emails, phone numbers), and
//! potentially sensitive binaries (images, presentations). It cannot prove
//! compliance. Flagged binaries consult the approval ledger: a matching
//! digest downgrades the finding, a changed file warns again.
//!
//! Unlike manifest building, the scan degrades per-file I/O failures to WARN
//! findings instead of aborting; a partial compliance scan is acceptable, a
//! partial change-manifest is not.

pub mod report;
pub mod rules;

use crate::config::ScanConfig;
use crate::fingerprint::hash_file_sha256;
use crate::ledger::ApprovalLedger;
use crate::manifest::relative_posix;
use crate::types::{Finding, Severity};
use regex::Regex;
use rules::PatternRule;
use std::path::Path;
use walkdir::WalkDir;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
pub const PRESENTATION_EXTENSIONS: &[&str] = &["ppt", "pptx", "key"];
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];
pub const TEXT_EXTENSIONS: &[&str] = &["md", "txt", "rst", "ipynb", "jl", "py"];

/// Finding messages shared with the approval workflow, which matches on
/// them to discover unapproved images in a report.
pub const MSG_IMAGE_UNAPPROVED: &str = "Image file present; manual privacy review required.";
pub const MSG_IMAGE_APPROVED: &str = "Image present and approved (pinned by SHA256).";
pub const MSG_IMAGE_SUSPICIOUS_NAME: &str =
    "Image filename suggests it may contain private info (email/grades/roster).";
pub const MSG_UNREADABLE: &str = "Could not read text file reliably.";

const HINT_IMAGE_UNAPPROVED: &str =
    "If approved after review, add it to the approval ledger so it won't warn again.";
const HINT_IMAGE_APPROVED: &str = "No further scrutiny required unless the file changes.";
const HINT_IMAGE_SUSPICIOUS: &str =
    "Do not store screenshots of email/grades/rosters in the repository unless reviewed and approved.";
const HINT_PRESENTATION: &str =
    "If public, ensure this is your own work or you have permission to share it.";
const HINT_DOCUMENT: &str = "If public, review for personal information before committing.";

/// Scans one repository tree against one ledger snapshot.
pub struct Scanner<'a> {
    root: &'a Path,
    config: &'a ScanConfig,
    ledger: &'a ApprovalLedger,
    rules: Vec<PatternRule>,
    email: Regex,
    phone: Regex,
    suspicious_name: Regex,
}

impl<'a> Scanner<'a> {
    pub fn new(root: &'a Path, config: &'a ScanConfig, ledger: &'a ApprovalLedger) -> Self {
        Scanner {
            root,
            config,
            ledger,
            rules: rules::builtin_rules(),
            email: rules::email_detector(),
            phone: rules::phone_detector(),
            suspicious_name: rules::suspicious_image_name(),
        }
    }

    /// Replace the built-in keyword rules (evaluation order is preserved).
    pub fn with_rules(mut self, rules: Vec<PatternRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Scan the whole tree. Findings come out in traversal order, required-
    /// file checks first.
    pub fn scan(&self) -> Vec<Finding> {
        let mut findings = Vec::new();

        if !self.root.is_dir() {
            findings.push(Finding::new(
                Severity::Error,
                ".",
                "Path does not exist or is not a directory.",
                None,
            ));
            return findings;
        }

        self.check_required_files(&mut findings);

        let walker = WalkDir::new(self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                match e.file_name().to_str() {
                    Some(name) => !self.config.exclude_dirs.contains(name),
                    None => true,
                }
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let rel = e
                        .path()
                        .map(|p| relative_posix(p, self.root))
                        .unwrap_or_else(|| ".".to_string());
                    findings.push(Finding::new(
                        Severity::Warn,
                        rel,
                        "Could not access path during scan.",
                        None,
                    ));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            self.scan_file(entry.path(), &mut findings);
        }

        findings
    }

    fn check_required_files(&self, findings: &mut Vec<Finding>) {
        for rel in &self.config.required_files {
            let path = self.root.join(rel);
            if !path.exists() {
                findings.push(Finding::new(
                    Severity::Warn,
                    rel.clone(),
                    format!("Missing recommended file: {rel}"),
                    Some("Add it to make expectations explicit for public readers."),
                ));
            } else if path.is_file() && path.metadata().map(|m| m.len() == 0).unwrap_or(false) {
                findings.push(Finding::new(
                    Severity::Warn,
                    rel.clone(),
                    format!("File is empty: {rel}"),
                    None,
                ));
            }
        }
    }

    fn scan_file(&self, path: &Path, findings: &mut Vec<Finding>) {
        let rel = relative_posix(path, self.root);
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            self.scan_image(path, &rel, findings);
        } else if PRESENTATION_EXTENSIONS.contains(&ext.as_str()) {
            self.scan_presentation(path, &rel, &ext, findings);
        } else if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            findings.push(Finding::new(
                Severity::Info,
                rel,
                format!("Document file present: .{ext}"),
                Some(HINT_DOCUMENT),
            ));
        } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            self.scan_text(path, &rel, findings);
        }
    }

    /// Images always require manual review unless their current digest is
    /// pinned in the ledger. A suspicious filename is an independent,
    /// non-suppressible ERROR: approval of content does not vouch for a
    /// misleading or sensitive filename.
    fn scan_image(&self, path: &Path, rel: &str, findings: &mut Vec<Finding>) {
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or(rel);
        let suspicious = self.suspicious_name.is_match(file_name);

        if suspicious {
            findings.push(Finding::new(
                Severity::Error,
                rel,
                MSG_IMAGE_SUSPICIOUS_NAME,
                Some(HINT_IMAGE_SUSPICIOUS),
            ));
        }

        let approved = match hash_file_sha256(path) {
            Ok(digest) => self.ledger.check(rel, &digest).is_approved(),
            Err(_) => {
                findings.push(Finding::new(Severity::Warn, rel, MSG_UNREADABLE, None));
                return;
            }
        };

        if suspicious {
            return;
        }

        if approved {
            findings.push(Finding::new(
                Severity::Info,
                rel,
                MSG_IMAGE_APPROVED,
                Some(HINT_IMAGE_APPROVED),
            ));
        } else {
            findings.push(Finding::new(
                Severity::Warn,
                rel,
                MSG_IMAGE_UNAPPROVED,
                Some(HINT_IMAGE_UNAPPROVED),
            ));
        }
    }

    /// Presentations are higher risk for redistribution. Export roots and
    /// ledger approval both downgrade to INFO.
    fn scan_presentation(&self, path: &Path, rel: &str, ext: &str, findings: &mut Vec<Finding>) {
        let mut severity = if self.config.is_export(rel) {
            Severity::Info
        } else {
            Severity::Warn
        };

        match hash_file_sha256(path) {
            Ok(digest) => {
                if self.ledger.check(rel, &digest).is_approved() {
                    severity = Severity::Info;
                }
            }
            Err(_) => {
                findings.push(Finding::new(Severity::Warn, rel, MSG_UNREADABLE, None));
                return;
            }
        }

        findings.push(Finding::new(
            severity,
            rel,
            format!("Presentation file present: .{ext}"),
            Some(HINT_PRESENTATION),
        ));
    }

    fn scan_text(&self, path: &Path, rel: &str, findings: &mut Vec<Finding>) {
        let text = match read_text(path) {
            Some(text) => text,
            None => {
                findings.push(Finding::new(Severity::Warn, rel, MSG_UNREADABLE, None));
                return;
            }
        };

        // PII detectors apply everywhere text is read.
        if let Some(m) = self.email.find(&text) {
            findings.push(Finding::new(
                Severity::Error,
                rel,
                format!("Found an email address: {}", rules::mask_email(m.as_str())),
                Some("Remove email addresses from tracked content."),
            ));
        }
        if let Some(m) = self.phone.find(&text) {
            findings.push(Finding::new(
                Severity::Error,
                rel,
                format!(
                    "Found a phone-number-like string: {}",
                    rules::mask_phone(m.as_str())
                ),
                Some("Remove phone numbers from tracked content."),
            ));
        }

        // Keyword rules are scoped to publishable content roots; policy docs
        // outside them necessarily mention the forbidden terms.
        if self.config.applies_keyword_rules(rel) {
            for rule in &self.rules {
                if rule.pattern.is_match(&text) {
                    findings.push(Finding::new(
                        rule.severity,
                        rel,
                        rule.message.clone(),
                        Some(&rule.hint),
                    ));
                }
            }
        }
    }
}

/// Read a file as text. Returns `None` when the file cannot be read or
/// looks binary (embedded NUL), which the caller degrades to a WARN.
fn read_text(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    if bytes.contains(&0) {
        return None;
    }
    Some(String::from_utf8_lossy(&bytes).into_owned())
}
