//! Repogate: Change Tracking and Publication Gating
//!
//! Tracks the state of a repository tree over time without git, and gates
//! publication of flagged content behind a content-addressed approval ledger.
//! The durable surface is two small JSON files (the state manifest and the
//! approval ledger); everything else is recomputed per run.

pub mod config;
pub mod diff;
pub mod error;
pub mod fingerprint;
pub mod ledger;
pub mod logging;
pub mod manifest;
pub mod scanner;
pub mod state;
pub mod tooling;
pub mod types;
