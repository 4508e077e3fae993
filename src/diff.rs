//! Diff Engine
//!
//! Pure comparison of two manifests. Unchanged paths are omitted; a missing
//! previous manifest is modeled as an empty one, so the very first run
//! reports every path as added.

use crate::manifest::Manifest;
use serde::{Deserialize, Serialize};

/// Delta between two manifests. All lists are sorted for determinism.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    pub fn total(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}

/// Classify every path as added, removed, or modified. Modification is
/// decided by fingerprint inequality, not just presence.
pub fn diff_manifests(prev: &Manifest, curr: &Manifest) -> Diff {
    let mut diff = Diff::default();

    for (path, fp) in &curr.files {
        match prev.files.get(path) {
            None => diff.added.push(path.clone()),
            Some(prev_fp) if prev_fp != fp => diff.modified.push(path.clone()),
            Some(_) => {}
        }
    }

    for path in prev.files.keys() {
        if !curr.files.contains_key(path) {
            diff.removed.push(path.clone());
        }
    }

    // BTreeMap iteration is already ordered; the lists inherit it.
    diff
}
