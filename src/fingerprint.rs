//! File Fingerprinting
//!
//! Produces a stable identity descriptor for one file at one instant: size,
//! modification time, and (below a size threshold) a full-content SHA-256.
//! Above the threshold the digest is omitted and equality falls back to
//! size+mtime alone. A large file whose content changes while preserving both
//! is therefore invisible to change detection; that tradeoff is intentional
//! and covered by tests rather than hidden.

use crate::error::ManifestError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Default full-content hash threshold: 5 MiB.
pub const DEFAULT_FULL_HASH_THRESHOLD_BYTES: u64 = 5 * 1024 * 1024;

const HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// Fingerprinting policy, threaded explicitly (never process-global).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Files at or below this size get a full-content SHA-256.
    pub full_hash_threshold_bytes: u64,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        FingerprintConfig {
            full_hash_threshold_bytes: DEFAULT_FULL_HASH_THRESHOLD_BYTES,
        }
    }
}

/// Identity descriptor for one file at one instant.
///
/// Two fingerprints are equal iff `size`, `mtime_ns`, and `sha256` are all
/// equal. Two `None` digests still compare equal whenever size and mtime
/// match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub size: u64,
    pub mtime_ns: u64,
    /// Lowercase hex SHA-256 of full content, or `None` above the threshold.
    pub sha256: Option<String>,
}

/// Fingerprint a single file. I/O failures are fatal to the caller's build.
pub fn fingerprint_file(
    path: &Path,
    config: &FingerprintConfig,
) -> Result<Fingerprint, ManifestError> {
    let meta = std::fs::metadata(path).map_err(|e| ManifestError::Metadata {
        path: path.to_path_buf(),
        source: e,
    })?;

    let size = meta.len();
    let mtime_ns = meta
        .modified()
        .map_err(|e| ManifestError::Metadata {
            path: path.to_path_buf(),
            source: e,
        })?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let sha256 = if size <= config.full_hash_threshold_bytes {
        Some(hash_file_sha256(path).map_err(|e| ManifestError::Hash {
            path: path.to_path_buf(),
            source: e,
        })?)
    } else {
        None
    };

    Ok(Fingerprint {
        size,
        mtime_ns,
        sha256,
    })
}

/// Full-content SHA-256 of a file as lowercase hex, read in 1 MiB chunks.
///
/// Used unconditionally by the approval ledger: approval safety is never
/// weakened by the size threshold.
pub fn hash_file_sha256(path: &Path) -> Result<String, std::io::Error> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn small_file_gets_full_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("small.txt");
        std::fs::write(&path, b"hello").unwrap();

        let fp = fingerprint_file(&path, &FingerprintConfig::default()).unwrap();
        assert_eq!(fp.size, 5);
        // sha256("hello")
        assert_eq!(
            fp.sha256.as_deref(),
            Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
        );
    }

    #[test]
    fn large_file_omits_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("large.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let config = FingerprintConfig {
            full_hash_threshold_bytes: 4,
        };
        let fp = fingerprint_file(&path, &config).unwrap();
        assert_eq!(fp.size, 10);
        assert!(fp.sha256.is_none());
    }

    #[test]
    fn single_byte_change_below_threshold_changes_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("note.md");
        let config = FingerprintConfig::default();

        std::fs::write(&path, b"aaaa").unwrap();
        let before = fingerprint_file(&path, &config).unwrap();

        std::fs::write(&path, b"aaab").unwrap();
        let after = fingerprint_file(&path, &config).unwrap();

        assert_eq!(before.size, after.size);
        assert_ne!(before.sha256, after.sha256);
        assert_ne!(before, after);
    }

    #[test]
    fn both_null_digests_compare_by_size_and_mtime_alone() {
        // Documented blind spot: above the threshold, equal size+mtime means
        // equal fingerprints even for different content.
        let a = Fingerprint {
            size: 100,
            mtime_ns: 42,
            sha256: None,
        };
        let b = Fingerprint {
            size: 100,
            mtime_ns: 42,
            sha256: None,
        };
        assert_eq!(a, b);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = fingerprint_file(
            &dir.path().join("absent.txt"),
            &FingerprintConfig::default(),
        );
        assert!(matches!(result, Err(ManifestError::Metadata { .. })));
    }

    #[test]
    fn ledger_hash_ignores_threshold() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.png");
        std::fs::write(&path, vec![7u8; 64]).unwrap();

        // hash_file_sha256 has no size cutoff by construction.
        let digest = hash_file_sha256(&path).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
