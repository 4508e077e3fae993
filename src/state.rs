//! State Store
//!
//! Persists the most recent manifest between runs. Loading is fail-open:
//! missing or corrupt state degrades to an empty baseline (one extra
//! "everything changed" run is recoverable; crashing maintenance tooling is
//! not). Saving is write-new-then-replace so a crash mid-write never mangles
//! the previous good state.

use crate::error::StateError;
use crate::manifest::{Manifest, MANIFEST_VERSION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Explicit parse outcome for persisted state. The caller decides the
/// fallback instead of relying on error suppression.
#[derive(Debug, PartialEq)]
pub enum LoadOutcome<T> {
    Loaded(T),
    Missing,
    Corrupt,
}

/// Read and parse a JSON file into a typed record, classifying failures.
pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> LoadOutcome<T> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LoadOutcome::Missing,
        Err(_) => return LoadOutcome::Corrupt,
    };
    match serde_json::from_str(&raw) {
        Ok(value) => LoadOutcome::Loaded(value),
        Err(_) => LoadOutcome::Corrupt,
    }
}

/// Serialize a record and replace `path` atomically (write temp, rename).
pub(crate) fn write_json_atomic<T: Serialize>(
    path: &Path,
    value: &T,
) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut rendered = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    rendered.push('\n');

    let tmp = tmp_path(path);
    std::fs::write(&tmp, rendered.as_bytes())?;
    std::fs::rename(&tmp, path)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string());
    name.push_str(".tmp");
    path.with_file_name(name)
}

/// UTC timestamp with second resolution, e.g. `2026-08-30T12:00:00Z`.
pub fn utc_now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Durable storage for the previous run's manifest.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StateStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last persisted manifest. A schema version mismatch counts
    /// as corruption.
    pub fn load(&self) -> LoadOutcome<Manifest> {
        match load_json::<Manifest>(&self.path) {
            LoadOutcome::Loaded(m) if m.version != MANIFEST_VERSION => LoadOutcome::Corrupt,
            outcome => outcome,
        }
    }

    /// Load with the conservative fallback: an empty baseline, which makes
    /// the next diff report everything as added.
    pub fn load_or_empty(&self) -> Manifest {
        match self.load() {
            LoadOutcome::Loaded(m) => m,
            LoadOutcome::Missing => Manifest::empty(),
            LoadOutcome::Corrupt => {
                tracing::warn!(
                    state_file = %self.path.display(),
                    "state file is corrupt; starting from an empty baseline"
                );
                Manifest::empty()
            }
        }
    }

    /// Persist the manifest. Callers invoke this only after all dependent
    /// work has succeeded, so a failed run never marks stale outputs fresh.
    pub fn save(&self, manifest: &Manifest) -> Result<(), StateError> {
        write_json_atomic(&self.path, manifest).map_err(|e| StateError::Write {
            path: self.path.clone(),
            source: e,
        })
    }
}
