//! Configuration
//!
//! Every tunable is threaded explicitly through constructors; there is no
//! process-global mutable state. An optional `repogate.toml` at the repo root
//! overrides the defaults. Unlike persisted state, config parse failures are
//! surfaced eagerly — config is caller input.

use crate::error::ConfigError;
use crate::fingerprint::FingerprintConfig;
use crate::ledger::DEFAULT_LEDGER_FILE;
use crate::logging::LoggingConfig;
use crate::manifest::WalkConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Default config file name at the repo root.
pub const CONFIG_FILE: &str = "repogate.toml";

/// Default state store location (inside the report directory so generated
/// artifacts never drive change detection).
pub const DEFAULT_STATE_FILE: &str = "reports/_repogate_state.json";

/// Scanner policy: which subtrees get which rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Top-level roots where academic/privacy keyword rules apply. Policy
    /// documents outside these roots necessarily discuss the forbidden
    /// terms, so the keyword rules are scoped; PII detectors are not.
    pub content_roots: BTreeSet<String>,
    /// Roots holding generated release artifacts; presentation findings
    /// there drop to INFO.
    pub export_roots: BTreeSet<String>,
    /// Directory names pruned from the scan walk.
    pub exclude_dirs: BTreeSet<String>,
    /// Files that should exist at the repo root; missing ones WARN.
    pub required_files: Vec<String>,
    /// Report directory, relative to the repo root.
    pub report_dir: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let content_roots = ["notes", "assets", "glossary", "index"];
        let export_roots = ["exports"];
        let exclude_dirs = [
            ".git",
            ".agent_session",
            ".venv",
            "local_untracked",
            "node_modules",
            "__pycache__",
            ".ruff_cache",
            "logs",
            "quarantine_legacy_archive",
            "archive",
            "temp",
            "reports",
        ];
        let required_files = [
            "README.md",
            "COMPLIANCE.md",
            "LICENSE.md",
            "CODE_OF_CONDUCT.md",
            "CONTRIBUTING.md",
        ];
        ScanConfig {
            content_roots: content_roots.iter().map(|s| s.to_string()).collect(),
            export_roots: export_roots.iter().map(|s| s.to_string()).collect(),
            exclude_dirs: exclude_dirs.iter().map(|s| s.to_string()).collect(),
            required_files: required_files.iter().map(|s| s.to_string()).collect(),
            report_dir: "reports".to_string(),
        }
    }
}

impl ScanConfig {
    /// Whether `rel_path`'s first component is one of `roots`.
    pub fn is_under_roots(rel_path: &str, roots: &BTreeSet<String>) -> bool {
        rel_path
            .split('/')
            .next()
            .is_some_and(|first| !first.is_empty() && roots.contains(first))
    }

    pub fn applies_keyword_rules(&self, rel_path: &str) -> bool {
        Self::is_under_roots(rel_path, &self.content_roots)
    }

    pub fn is_export(&self, rel_path: &str) -> bool {
        Self::is_under_roots(rel_path, &self.export_roots)
    }
}

/// Top-level configuration for one repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub fingerprint: FingerprintConfig,
    pub walk: WalkConfig,
    pub scan: ScanConfig,
    pub logging: LoggingConfig,
    /// State store path, relative to the repo root.
    pub state_file: Option<String>,
    /// Approval ledger path, relative to the repo root.
    pub ledger_file: Option<String>,
}

impl RepoConfig {
    pub fn state_file(&self) -> &str {
        self.state_file.as_deref().unwrap_or(DEFAULT_STATE_FILE)
    }

    pub fn ledger_file(&self) -> &str {
        self.ledger_file.as_deref().unwrap_or(DEFAULT_LEDGER_FILE)
    }

    /// Walk config for manifest builds: the configured exclusions plus the
    /// state store's own file, so persistence never perturbs the next diff.
    pub fn manifest_walk_config(&self) -> WalkConfig {
        let mut walk = self.walk.clone();
        walk.exclude_files.insert(self.state_file().to_string());
        walk
    }
}

/// Load configuration for `repo_root`. An explicit path must exist; the
/// default `repogate.toml` is optional.
pub fn load_config(repo_root: &Path, explicit: Option<&Path>) -> Result<RepoConfig, ConfigError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let default = repo_root.join(CONFIG_FILE);
            if !default.exists() {
                return Ok(RepoConfig::default());
            }
            default
        }
    };

    let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
        path: path.clone(),
        source: e,
    })?;
    toml::from_str(&raw).map_err(|e| ConfigError::Parse { path, source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_cover_the_publishable_roots() {
        let scan = ScanConfig::default();
        assert!(scan.applies_keyword_rules("notes/Fall/week01/a.md"));
        assert!(scan.applies_keyword_rules("glossary/terms.md"));
        assert!(!scan.applies_keyword_rules("COMPLIANCE.md"));
        assert!(!scan.applies_keyword_rules("tools/policy.md"));
        assert!(scan.is_export("exports/deck.pptx"));
    }

    #[test]
    fn missing_default_config_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(config.state_file(), DEFAULT_STATE_FILE);
        assert_eq!(config.ledger_file(), DEFAULT_LEDGER_FILE);
    }

    #[test]
    fn toml_overrides_merge_over_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "state_file = \"state/manifest.json\"\n\n[scan]\ncontent_roots = [\"docs\"]\n",
        )
        .unwrap();

        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(config.state_file(), "state/manifest.json");
        assert!(config.scan.applies_keyword_rules("docs/a.md"));
        assert!(!config.scan.applies_keyword_rules("notes/a.md"));
        // Untouched sections keep their defaults.
        assert_eq!(
            config.fingerprint.full_hash_threshold_bytes,
            crate::fingerprint::DEFAULT_FULL_HASH_THRESHOLD_BYTES
        );
    }

    #[test]
    fn invalid_toml_is_an_eager_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "state_file = [not toml").unwrap();
        assert!(matches!(
            load_config(dir.path(), None),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let result = load_config(dir.path(), Some(&dir.path().join("missing.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn manifest_walk_excludes_the_state_file() {
        let config = RepoConfig::default();
        let walk = config.manifest_walk_config();
        assert!(walk.exclude_files.contains(DEFAULT_STATE_FILE));
    }
}
