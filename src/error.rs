//! Error types
//!
//! One small enum per concern. Manifest building is the only fatal path: a
//! partial change-manifest could hide a should-be-flagged change, so walk and
//! fingerprint failures abort the build. Persisted-state corruption is never
//! surfaced as an error (see `state::LoadOutcome`).

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors while building a manifest. There is deliberately no
/// "skip this file" variant.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest root does not exist or is not a directory: {0}")]
    InvalidRoot(PathBuf),

    #[error("failed to walk tree at {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("failed to read metadata for {path}: {source}")]
    Metadata {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to hash {path}: {source}")]
    Hash {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("fingerprint worker panicked")]
    WorkerPanic,
}

/// Errors persisting the state manifest. Loading never errors; see
/// `state::LoadOutcome`.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to persist state to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Approval ledger errors, rejected eagerly at the API boundary.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("unknown approval category: {0}")]
    UnknownCategory(String),

    #[error("not a file: {0}")]
    NotAFile(String),

    #[error("failed to hash {path}: {source}")]
    Hash {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to persist ledger to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Configuration errors. Unlike persisted state, the config file is caller
/// input, so parse failures are surfaced synchronously instead of failing
/// open.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

/// Errors writing compliance reports.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A pattern rule failed to compile.
#[derive(Debug, Error)]
#[error("rule '{message}' has invalid pattern '{pattern}': {source}")]
pub struct RuleError {
    pub message: String,
    pub pattern: String,
    pub source: regex::Error,
}
