//! Repogate CLI Binary
//!
//! Change tracking and compliance gating for public repositories.

use clap::Parser;
use repogate::logging::init_logging;
use repogate::tooling::cli::{load_cli_config, run, Cli};
use std::process;

fn main() {
    let cli = Cli::parse();

    let config = match load_cli_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(3);
        }
    };

    if let Err(e) = init_logging(&cli.logging_config(&config)) {
        eprintln!("Error initializing logging: {e}");
        process::exit(3);
    }

    match run(&cli, &config) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(3);
        }
    }
}
