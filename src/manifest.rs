//! Manifest Builder
//!
//! Walks a repository tree and produces a complete snapshot mapping every
//! non-excluded regular file to its fingerprint. Symlink cycles and unreadable
//! entries fail the whole build; a partial manifest must never be mistaken for
//! a complete one.

use crate::error::ManifestError;
use crate::fingerprint::{fingerprint_file, Fingerprint, FingerprintConfig};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const MANIFEST_VERSION: u32 = 1;

/// Upper bound on fingerprint worker threads.
const MAX_WORKERS: usize = 8;

/// Traversal exclusions, threaded explicitly into the builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Directory names pruned wherever they appear in the tree.
    pub exclude_dirs: BTreeSet<String>,
    /// File names or repo-relative paths skipped entirely (e.g. the state
    /// store's own file, generated indexes).
    pub exclude_files: BTreeSet<String>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        let exclude_dirs = [
            ".git",
            ".github",
            "__pycache__",
            ".pytest_cache",
            ".mypy_cache",
            ".ruff_cache",
            ".venv",
            "venv",
            "node_modules",
            // Local-only / archival areas never drive change detection.
            "local_untracked",
            "quarantine_legacy_archive",
            "archive",
            "temp",
            // Generated artifacts never drive change detection.
            "reports",
        ];
        WalkConfig {
            exclude_dirs: exclude_dirs.iter().map(|s| s.to_string()).collect(),
            exclude_files: BTreeSet::new(),
        }
    }
}

/// A complete snapshot of the tree at one point in time.
///
/// `files` maps repo-relative POSIX paths to fingerprints; the map is keyed,
/// so traversal order never affects the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub generated_at: Option<String>,
    pub files: BTreeMap<String, Fingerprint>,
}

impl Manifest {
    /// The baseline used when no previous manifest exists: every current
    /// path diffs as added, which forces regeneration on the first run.
    pub fn empty() -> Self {
        Manifest {
            version: MANIFEST_VERSION,
            generated_at: None,
            files: BTreeMap::new(),
        }
    }
}

/// Builds a manifest for one root directory.
pub struct ManifestBuilder {
    root: PathBuf,
    walk: WalkConfig,
    fingerprint: FingerprintConfig,
    parallel: bool,
}

impl ManifestBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ManifestBuilder {
            root: root.into(),
            walk: WalkConfig::default(),
            fingerprint: FingerprintConfig::default(),
            parallel: true,
        }
    }

    pub fn with_walk_config(mut self, walk: WalkConfig) -> Self {
        self.walk = walk;
        self
    }

    pub fn with_fingerprint_config(mut self, fingerprint: FingerprintConfig) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    /// Disable the fingerprint worker pool. Output is identical either way;
    /// the pool only changes throughput.
    pub fn serial(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Walk the tree and fingerprint every non-excluded regular file.
    pub fn build(&self) -> Result<Manifest, ManifestError> {
        if !self.root.is_dir() {
            return Err(ManifestError::InvalidRoot(self.root.clone()));
        }

        let entries = self.collect_paths()?;

        let files = if self.parallel && entries.len() > 1 {
            self.fingerprint_parallel(&entries)?
        } else {
            let mut files = BTreeMap::new();
            for (rel, abs) in &entries {
                files.insert(rel.clone(), fingerprint_file(abs, &self.fingerprint)?);
            }
            files
        };

        Ok(Manifest {
            version: MANIFEST_VERSION,
            generated_at: Some(crate::state::utc_now_iso()),
            files,
        })
    }

    /// Collect (relative POSIX path, absolute path) pairs for every tracked
    /// file. Walk errors (permission denied, symlink cycles) are fatal.
    fn collect_paths(&self) -> Result<Vec<(String, PathBuf)>, ManifestError> {
        let mut entries = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                match e.file_name().to_str() {
                    Some(name) => !self.walk.exclude_dirs.contains(name),
                    None => true,
                }
            });

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.root.clone());
                ManifestError::Walk { path, source: e }
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let rel = relative_posix(entry.path(), &self.root);
            let name = entry.file_name().to_string_lossy().to_string();
            if self.walk.exclude_files.contains(&name) || self.walk.exclude_files.contains(&rel) {
                continue;
            }

            entries.push((rel, entry.path().to_path_buf()));
        }

        Ok(entries)
    }

    /// Fingerprint independent files on a small thread pool. The final map
    /// assembly is the only shared state and is serialized behind a mutex.
    fn fingerprint_parallel(
        &self,
        entries: &[(String, PathBuf)],
    ) -> Result<BTreeMap<String, Fingerprint>, ManifestError> {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(MAX_WORKERS)
            .min(entries.len())
            .max(1);
        let chunk_size = entries.len().div_ceil(workers);

        let files: Mutex<BTreeMap<String, Fingerprint>> = Mutex::new(BTreeMap::new());

        std::thread::scope(|scope| {
            let mut handles = Vec::new();
            for chunk in entries.chunks(chunk_size) {
                let files = &files;
                let fingerprint = &self.fingerprint;
                handles.push(scope.spawn(move || -> Result<(), ManifestError> {
                    for (rel, abs) in chunk {
                        let fp = fingerprint_file(abs, fingerprint)?;
                        files.lock().insert(rel.clone(), fp);
                    }
                    Ok(())
                }));
            }
            for handle in handles {
                match handle.join() {
                    Ok(result) => result?,
                    Err(_) => return Err(ManifestError::WorkerPanic),
                }
            }
            Ok(())
        })?;

        Ok(files.into_inner())
    }
}

/// Render a path relative to `root` with forward slashes.
pub fn relative_posix(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
