//! Tooling
//!
//! Operator-facing surfaces: the command-line interface. Library consumers
//! should depend on the core modules directly.

pub mod cli;

pub use cli::{run, Cli, Commands};
