//! Logging System
//!
//! Structured logging via `tracing`. Diagnostics go to stderr so stdout
//! stays clean for command output (tables, JSON). The `REPOGATE_LOG`
//! environment variable overrides the configured level with a full
//! `EnvFilter` directive string.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether logging is enabled (default: true)
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    pub level: String,

    /// Output format: json, text (default: text)
    pub format: String,

    /// Enable colored output (text format only)
    pub color: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "warn".to_string(),
            format: "text".to_string(),
            color: true,
        }
    }
}

/// Initialize the logging system.
///
/// Priority order (highest to lowest):
/// 1. `REPOGATE_LOG` environment variable (full filter directive)
/// 2. The supplied configuration (CLI flags already merged in)
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        Registry::default()
            .with(EnvFilter::new("off"))
            .with(fmt::layer().with_writer(std::io::sink))
            .init();
        return Ok(());
    }

    let filter = build_env_filter(config)?;
    let base = Registry::default().with(filter);

    match config.format.as_str() {
        "json" => {
            base.with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
        }
        "text" => {
            base.with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(config.color)
                    .with_writer(std::io::stderr),
            )
            .init();
        }
        other => {
            return Err(ConfigError::Logging(format!(
                "Invalid log format: {other} (must be 'json' or 'text')"
            )));
        }
    }

    Ok(())
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_env("REPOGATE_LOG") {
        return Ok(filter);
    }
    // `EnvFilter` would accept any bare word as a target directive, so the
    // level is validated as a level before the filter is built.
    let level = LevelFilter::from_str(&config.level).map_err(|_| {
        ConfigError::Logging(format!(
            "Invalid log level '{}' (use trace, debug, info, warn, error, or off)",
            config.level
        ))
    })?;
    Ok(EnvFilter::new(level.to_string()))
}
