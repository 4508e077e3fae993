//! Approval Ledger
//!
//! A digest-pinned allow-list for artifacts that passed manual review.
//! Entries are keyed by repo-relative POSIX path and pinned by full-content
//! SHA-256; any byte-level change invalidates an entry without removing it.
//! A malformed ledger degrades to an empty one, which maximizes findings —
//! the safe direction.

use crate::error::LedgerError;
use crate::fingerprint::hash_file_sha256;
use crate::state::{load_json, utc_now_iso, write_json_atomic, LoadOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const LEDGER_VERSION: u32 = 1;

/// Default ledger file name at the repo root.
pub const DEFAULT_LEDGER_FILE: &str = "approved_artifacts.json";

/// Closed set of approval categories. Unknown strings are rejected at the
/// API boundary before the ledger is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Image,
    Document,
    Presentation,
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Image => "image",
            Category::Document => "document",
            Category::Presentation => "presentation",
            Category::Other => "other",
        }
    }
}

impl FromStr for Category {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Category::Image),
            "document" => Ok(Category::Document),
            "presentation" => Ok(Category::Presentation),
            "other" => Ok(Category::Other),
            other => Err(LedgerError::UnknownCategory(other.to_string())),
        }
    }
}

/// One pinned clearance. Unlike a manifest fingerprint, the digest here is
/// mandatory and always covers full content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalEntry {
    pub sha256: String,
    pub category: Category,
    pub approved_utc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    approved: BTreeMap<String, ApprovalEntry>,
}

/// Result of an approval lookup. `reason` mirrors the report wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalCheck {
    Approved,
    NotListed,
    DigestMismatch,
    MissingDigest,
}

impl ApprovalCheck {
    pub fn is_approved(self) -> bool {
        self == ApprovalCheck::Approved
    }

    pub fn reason(self) -> Option<&'static str> {
        match self {
            ApprovalCheck::Approved => None,
            ApprovalCheck::NotListed => Some("not listed"),
            ApprovalCheck::DigestMismatch => Some("sha256 mismatch"),
            ApprovalCheck::MissingDigest => Some("missing sha256"),
        }
    }
}

/// The allow-list itself. In-memory mutations are explicit; nothing touches
/// disk until `save`.
pub struct ApprovalLedger {
    path: PathBuf,
    approved: BTreeMap<String, ApprovalEntry>,
}

impl ApprovalLedger {
    /// Open the ledger at `path`, degrading to empty on missing or malformed
    /// content.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let approved = match load_json::<LedgerFile>(&path) {
            LoadOutcome::Loaded(file) if file.version == LEDGER_VERSION => file.approved,
            LoadOutcome::Loaded(_) | LoadOutcome::Corrupt => {
                tracing::warn!(
                    ledger_file = %path.display(),
                    "approval ledger is malformed; treating it as empty"
                );
                BTreeMap::new()
            }
            LoadOutcome::Missing => BTreeMap::new(),
        };
        ApprovalLedger { path, approved }
    }

    /// An empty in-memory ledger (used by tests and dry runs).
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        ApprovalLedger {
            path: path.into(),
            approved: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.approved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.approved.is_empty()
    }

    /// Check whether `rel_path` is cleared for its current content digest.
    /// Hex comparison is case-insensitive; otherwise equality is exact.
    pub fn check(&self, rel_path: &str, current_digest: &str) -> ApprovalCheck {
        let Some(entry) = self.approved.get(rel_path) else {
            return ApprovalCheck::NotListed;
        };
        if entry.sha256.is_empty() {
            return ApprovalCheck::MissingDigest;
        }
        if entry.sha256.eq_ignore_ascii_case(current_digest) {
            ApprovalCheck::Approved
        } else {
            ApprovalCheck::DigestMismatch
        }
    }

    pub fn get(&self, rel_path: &str) -> Option<&ApprovalEntry> {
        self.approved.get(rel_path)
    }

    /// Insert or overwrite the entry for `rel_path`.
    pub fn approve(
        &mut self,
        rel_path: impl Into<String>,
        digest: impl Into<String>,
        category: Category,
        note: Option<&str>,
    ) {
        self.approved.insert(
            rel_path.into(),
            ApprovalEntry {
                sha256: digest.into(),
                category,
                approved_utc: utc_now_iso(),
                notes: note.map(|n| n.to_string()),
            },
        );
    }

    /// Hash a file's full content (no size threshold) and pin it. The file
    /// must exist; missing paths are rejected eagerly.
    pub fn approve_file(
        &mut self,
        repo_root: &Path,
        rel_path: &str,
        category: Category,
        note: Option<&str>,
    ) -> Result<String, LedgerError> {
        let abs = repo_root.join(rel_path);
        if !abs.is_file() {
            return Err(LedgerError::NotAFile(rel_path.to_string()));
        }
        let digest = hash_file_sha256(&abs).map_err(|e| LedgerError::Hash {
            path: abs.clone(),
            source: e,
        })?;
        self.approve(rel_path, digest.clone(), category, note);
        Ok(digest)
    }

    /// Remove the entry if present. Returns whether anything was removed.
    pub fn revoke(&mut self, rel_path: &str) -> bool {
        self.approved.remove(rel_path).is_some()
    }

    /// All entries, sorted by path, for audit.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &ApprovalEntry)> {
        self.approved.iter()
    }

    pub fn save(&self) -> Result<(), LedgerError> {
        let file = LedgerFile {
            version: LEDGER_VERSION,
            approved: self.approved.clone(),
        };
        write_json_atomic(&self.path, &file).map_err(|e| LedgerError::Write {
            path: self.path.clone(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DIGEST: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn category_parsing_rejects_unknown() {
        assert_eq!("image".parse::<Category>().unwrap(), Category::Image);
        assert!(matches!(
            "screenshot".parse::<Category>(),
            Err(LedgerError::UnknownCategory(_))
        ));
    }

    #[test]
    fn check_reports_typed_reasons() {
        let mut ledger = ApprovalLedger::empty("ledger.json");
        assert_eq!(ledger.check("a.png", DIGEST), ApprovalCheck::NotListed);

        ledger.approve("a.png", DIGEST, Category::Image, Some("reviewed"));
        assert_eq!(ledger.check("a.png", DIGEST), ApprovalCheck::Approved);
        assert_eq!(ledger.check("a.png", "ffff"), ApprovalCheck::DigestMismatch);

        ledger.approve("b.png", "", Category::Image, None);
        assert_eq!(ledger.check("b.png", DIGEST), ApprovalCheck::MissingDigest);
    }

    #[test]
    fn digest_comparison_is_case_insensitive() {
        let mut ledger = ApprovalLedger::empty("ledger.json");
        ledger.approve("a.png", DIGEST.to_uppercase(), Category::Image, None);
        assert!(ledger.check("a.png", DIGEST).is_approved());
    }

    #[test]
    fn content_change_invalidates_without_mutating_the_ledger() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("x.png");
        std::fs::write(&image, b"first").unwrap();

        let mut ledger = ApprovalLedger::empty(dir.path().join("ledger.json"));
        let pinned = ledger
            .approve_file(dir.path(), "x.png", Category::Image, None)
            .unwrap();
        assert!(ledger.check("x.png", &pinned).is_approved());

        std::fs::write(&image, b"second").unwrap();
        let current = hash_file_sha256(&image).unwrap();
        assert_eq!(ledger.check("x.png", &current), ApprovalCheck::DigestMismatch);
        // The stale entry stays until explicitly revoked or re-approved.
        assert_eq!(ledger.get("x.png").unwrap().sha256, pinned);
    }

    #[test]
    fn revoke_is_a_noop_when_absent() {
        let mut ledger = ApprovalLedger::empty("ledger.json");
        assert!(!ledger.revoke("missing.png"));
        ledger.approve("a.png", DIGEST, Category::Image, None);
        assert!(ledger.revoke("a.png"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn round_trip_preserves_entries_sorted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");

        let mut ledger = ApprovalLedger::empty(&path);
        ledger.approve("z.png", DIGEST, Category::Image, None);
        ledger.approve("a.pdf", DIGEST, Category::Document, Some("ok"));
        ledger.save().unwrap();

        let reloaded = ApprovalLedger::open(&path);
        let paths: Vec<_> = reloaded.entries().map(|(p, _)| p.clone()).collect();
        assert_eq!(paths, vec!["a.pdf", "z.png"]);
        assert_eq!(reloaded.get("a.pdf").unwrap().notes.as_deref(), Some("ok"));
    }

    #[test]
    fn malformed_ledger_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, b"not json at all").unwrap();

        let ledger = ApprovalLedger::open(&path);
        assert!(ledger.is_empty());
    }

    #[test]
    fn approving_a_missing_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut ledger = ApprovalLedger::empty(dir.path().join("ledger.json"));
        let result = ledger.approve_file(dir.path(), "ghost.png", Category::Image, None);
        assert!(matches!(result, Err(LedgerError::NotAFile(_))));
    }
}
