//! CLI Tooling
//!
//! Command-line interface over the fingerprint, ledger, and scanner engines.
//! Commands print their results to stdout; diagnostics go to stderr through
//! `tracing`. Exit codes: 0 clean, 1 warnings under `--strict`, 2 errors,
//! 3 when the tool itself fails.

use crate::config::{load_config, RepoConfig};
use crate::diff::diff_manifests;
use crate::ledger::{ApprovalLedger, Category};
use crate::logging::LoggingConfig;
use crate::manifest::{relative_posix, ManifestBuilder};
use crate::scanner::report::{load_report, write_reports, ComplianceReport};
use crate::scanner::{Scanner, IMAGE_EXTENSIONS, MSG_IMAGE_UNAPPROVED};
use crate::state::{LoadOutcome, StateStore};
use crate::types::{RunStatus, Severity};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_BORDERS_ONLY, Table};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Repogate CLI - change tracking and compliance gating for public repos
#[derive(Parser)]
#[command(name = "repogate")]
#[command(about = "Track file changes and gate a repository on compliance scans")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Repository root directory
    #[arg(long, default_value = ".")]
    pub repo_root: PathBuf,

    /// Configuration file path (overrides repogate.toml discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (shorthand for --log-level debug)
    #[arg(long, short)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fingerprint the tree and report changes since the last run
    Scan {
        /// Report changes without updating the stored state
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the compliance scan and write reports
    Check {
        /// Treat warnings as failures (exit 1)
        #[arg(long)]
        strict: bool,
    },
    /// Approve artifacts by pinning their current content digest
    Approve {
        /// Repo-relative paths to approve
        paths: Vec<String>,

        /// Approval category (image, document, presentation, other)
        #[arg(long, default_value = "image")]
        category: String,

        /// Free-form note stored with each approval
        #[arg(long)]
        note: Option<String>,

        /// Approve every image file in the tree
        #[arg(long)]
        all_images: bool,

        /// Restrict --all-images to paths under this prefix
        #[arg(long)]
        under: Option<String>,

        /// List unapproved images from the last compliance report and exit
        #[arg(long)]
        list_new: bool,

        /// Approve every unapproved image from the last compliance report
        #[arg(long)]
        approve_all_new: bool,

        /// Review unapproved images one by one
        #[arg(long, short)]
        interactive: bool,
    },
    /// Remove an approval entry
    Revoke {
        /// Repo-relative path to revoke
        path: String,
    },
    /// List approval ledger entries
    List {
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Scan for changes, then run the compliance check
    Run {
        /// Treat warnings as failures (exit 1)
        #[arg(long)]
        strict: bool,

        /// Report changes without updating the stored state
        #[arg(long)]
        dry_run: bool,
    },
}

impl Cli {
    /// Logging settings with CLI flags merged over the config file.
    pub fn logging_config(&self, config: &RepoConfig) -> LoggingConfig {
        let mut logging = config.logging.clone();
        if self.verbose {
            logging.level = "debug".to_string();
        }
        if let Some(level) = &self.log_level {
            logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            logging.format = format.clone();
        }
        logging
    }
}

/// Load config for the CLI invocation. Split out so the binary can set up
/// logging before dispatching.
pub fn load_cli_config(cli: &Cli) -> anyhow::Result<RepoConfig> {
    load_config(&cli.repo_root, cli.config.as_deref()).context("failed to load configuration")
}

/// Execute the parsed command. Returns the process exit code; tool failures
/// surface as errors and map to exit 3 in the binary.
pub fn run(cli: &Cli, config: &RepoConfig) -> anyhow::Result<i32> {
    if !cli.repo_root.is_dir() {
        bail!("repository root is not a directory: {}", cli.repo_root.display());
    }

    match &cli.command {
        Commands::Scan { dry_run } => run_scan(&cli.repo_root, config, *dry_run),
        Commands::Check { strict } => run_check(&cli.repo_root, config, *strict),
        Commands::Run { strict, dry_run } => {
            run_scan(&cli.repo_root, config, *dry_run)?;
            run_check(&cli.repo_root, config, *strict)
        }
        Commands::Approve {
            paths,
            category,
            note,
            all_images,
            under,
            list_new,
            approve_all_new,
            interactive,
        } => run_approve(
            &cli.repo_root,
            config,
            ApproveArgs {
                paths,
                category,
                note: note.as_deref(),
                all_images: *all_images,
                under: under.as_deref(),
                list_new: *list_new,
                approve_all_new: *approve_all_new,
                interactive: *interactive,
            },
        ),
        Commands::Revoke { path } => run_revoke(&cli.repo_root, config, path),
        Commands::List { format } => run_list(&cli.repo_root, config, format),
    }
}

fn run_scan(repo_root: &Path, config: &RepoConfig, dry_run: bool) -> anyhow::Result<i32> {
    let manifest = ManifestBuilder::new(repo_root)
        .with_walk_config(config.manifest_walk_config())
        .with_fingerprint_config(config.fingerprint.clone())
        .build()
        .context("failed to fingerprint the repository tree")?;

    let store = StateStore::new(repo_root.join(config.state_file()));
    let previous = store.load_or_empty();
    let diff = diff_manifests(&previous, &manifest);

    info!(
        files = manifest.files.len(),
        changes = diff.total(),
        "scan complete"
    );

    println!(
        "Scanned {} files, {} changed: {} added, {} removed, {} modified",
        manifest.files.len(),
        diff.total(),
        diff.added.len(),
        diff.removed.len(),
        diff.modified.len()
    );
    for path in &diff.added {
        println!("  {} {}", "+".green(), path);
    }
    for path in &diff.removed {
        println!("  {} {}", "-".red(), path);
    }
    for path in &diff.modified {
        println!("  {} {}", "~".yellow(), path);
    }

    if dry_run {
        println!("Dry run: state not updated.");
    } else {
        store
            .save(&manifest)
            .context("failed to persist the fingerprint state")?;
    }

    Ok(0)
}

fn run_check(repo_root: &Path, config: &RepoConfig, strict: bool) -> anyhow::Result<i32> {
    let ledger = ApprovalLedger::open(repo_root.join(config.ledger_file()));
    let findings = Scanner::new(repo_root, &config.scan, &ledger).scan();
    let report = ComplianceReport::from_findings(findings);

    let report_dir = repo_root.join(&config.scan.report_dir);
    write_reports(&report_dir, &report).context("failed to write compliance reports")?;

    print_report(&report);
    println!(
        "Reports written to {}",
        relative_posix(&report_dir, repo_root)
    );

    Ok(report.exit_code(strict))
}

fn print_report(report: &ComplianceReport) {
    if !report.findings.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Severity", "Path", "Message"]);
        for f in &report.findings {
            let severity = match f.severity {
                Severity::Error => f.severity.as_str().red().to_string(),
                Severity::Warn => f.severity.as_str().yellow().to_string(),
                Severity::Info => f.severity.as_str().to_string(),
            };
            table.add_row(vec![severity, f.path.clone(), f.message.clone()]);
        }
        println!("{table}");
    }

    let status = match report.status {
        RunStatus::Pass => report.status.as_str().green().to_string(),
        RunStatus::Warn => report.status.as_str().yellow().to_string(),
        RunStatus::Fail => report.status.as_str().red().to_string(),
    };
    println!(
        "Status: {status} ({} findings, {} errors, {} warnings)",
        report.counts.total, report.counts.error, report.counts.warn
    );
}

struct ApproveArgs<'a> {
    paths: &'a [String],
    category: &'a str,
    note: Option<&'a str>,
    all_images: bool,
    under: Option<&'a str>,
    list_new: bool,
    approve_all_new: bool,
    interactive: bool,
}

fn run_approve(repo_root: &Path, config: &RepoConfig, args: ApproveArgs<'_>) -> anyhow::Result<i32> {
    let category: Category = args.category.parse()?;
    let mut ledger = ApprovalLedger::open(repo_root.join(config.ledger_file()));

    if args.list_new {
        let new = unapproved_from_report(repo_root, config)?;
        if new.is_empty() {
            println!("No unapproved images in the last compliance report.");
        } else {
            for path in &new {
                println!("{path}");
            }
        }
        return Ok(0);
    }

    let targets: Vec<String> = if args.approve_all_new {
        let new = unapproved_from_report(repo_root, config)?;
        if new.is_empty() {
            println!("No unapproved images in the last compliance report.");
            return Ok(0);
        }
        confirm_bulk_approval(new.len())?;
        new
    } else if args.interactive {
        let new = unapproved_from_report(repo_root, config)?;
        if new.is_empty() {
            println!("No unapproved images in the last compliance report.");
            return Ok(0);
        }
        interactive_review(&new)?
    } else if args.all_images {
        let images = collect_images(repo_root, config, args.under);
        if images.is_empty() {
            println!("No image files found.");
            return Ok(0);
        }
        confirm_bulk_approval(images.len())?;
        images
    } else if args.paths.is_empty() {
        bail!("no paths given; pass paths or one of --all-images/--list-new/--approve-all-new/--interactive");
    } else {
        args.paths.to_vec()
    };

    for rel in &targets {
        let digest = ledger
            .approve_file(repo_root, rel, category, args.note)
            .with_context(|| format!("failed to approve {rel}"))?;
        println!("Approved {rel} ({})", &digest[..12.min(digest.len())]);
    }
    ledger.save().context("failed to save the approval ledger")?;
    println!("{} entries in the ledger.", ledger.len());

    Ok(0)
}

fn run_revoke(repo_root: &Path, config: &RepoConfig, path: &str) -> anyhow::Result<i32> {
    let mut ledger = ApprovalLedger::open(repo_root.join(config.ledger_file()));
    if ledger.revoke(path) {
        ledger.save().context("failed to save the approval ledger")?;
        println!("Revoked {path}");
    } else {
        println!("Not in the ledger: {path}");
    }
    Ok(0)
}

fn run_list(repo_root: &Path, config: &RepoConfig, format: &str) -> anyhow::Result<i32> {
    let ledger = ApprovalLedger::open(repo_root.join(config.ledger_file()));

    match format {
        "json" => {
            let entries: serde_json::Map<String, serde_json::Value> = ledger
                .entries()
                .map(|(path, entry)| {
                    (path.clone(), serde_json::to_value(entry).unwrap_or_default())
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        "table" => {
            if ledger.is_empty() {
                println!("The approval ledger is empty.");
                return Ok(0);
            }
            let mut table = Table::new();
            table.load_preset(UTF8_BORDERS_ONLY);
            table.set_header(vec!["Path", "Category", "SHA256", "Approved (UTC)", "Notes"]);
            for (path, entry) in ledger.entries() {
                table.add_row(vec![
                    path.clone(),
                    entry.category.as_str().to_string(),
                    entry.sha256.chars().take(12).collect(),
                    entry.approved_utc.clone(),
                    entry.notes.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        other => bail!("unknown list format: {other} (use 'table' or 'json')"),
    }

    Ok(0)
}

/// Unapproved images according to the last written compliance report. The
/// report is the source of truth so the approval set matches what the
/// operator just saw.
fn unapproved_from_report(repo_root: &Path, config: &RepoConfig) -> anyhow::Result<Vec<String>> {
    let report_dir = repo_root.join(&config.scan.report_dir);
    let report = match load_report(&report_dir) {
        LoadOutcome::Loaded(report) => report,
        LoadOutcome::Missing => {
            bail!("no compliance report found; run `repogate check` first")
        }
        LoadOutcome::Corrupt => {
            bail!("the last compliance report is unreadable; run `repogate check` again")
        }
    };

    Ok(report
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Warn && f.message == MSG_IMAGE_UNAPPROVED)
        .map(|f| f.path.clone())
        .collect())
}

/// Every image file in the tree, honoring the scan exclusions, optionally
/// filtered to a path prefix.
fn collect_images(repo_root: &Path, config: &RepoConfig, under: Option<&str>) -> Vec<String> {
    let mut images = Vec::new();
    let walker = WalkDir::new(repo_root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            match e.file_name().to_str() {
                Some(name) => !config.scan.exclude_dirs.contains(name),
                None => true,
            }
        });

    for entry in walker.flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let ext = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }
        let rel = relative_posix(entry.path(), repo_root);
        if let Some(prefix) = under {
            let prefix = prefix.trim_end_matches('/');
            if rel != prefix && !rel.starts_with(&format!("{prefix}/")) {
                continue;
            }
        }
        images.push(rel);
    }

    images.sort();
    images
}

/// Bulk approval needs an interactive operator typing a confirmation phrase.
/// CI runs and piped stdin are refused outright.
fn confirm_bulk_approval(count: usize) -> anyhow::Result<()> {
    if !interactive_allowed() {
        bail!("bulk approval requires an interactive terminal outside CI");
    }
    println!("About to approve {count} file(s) in one step.");
    let phrase: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Type APPROVE_ALL to confirm")
        .allow_empty(true)
        .interact_text()?;
    if phrase != "APPROVE_ALL" {
        bail!("bulk approval cancelled");
    }
    Ok(())
}

fn interactive_review(candidates: &[String]) -> anyhow::Result<Vec<String>> {
    if !interactive_allowed() {
        bail!("interactive review requires an interactive terminal outside CI");
    }

    let mut selected = Vec::new();
    loop {
        let remaining = candidates.len() - selected.len();
        let choice = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("{remaining} unapproved image(s)"))
            .items(&["Review one by one", "List remaining", "Done"])
            .default(0)
            .interact()?;
        match choice {
            0 => {
                for path in candidates {
                    if selected.contains(path) {
                        continue;
                    }
                    let approve = Confirm::with_theme(&ColorfulTheme::default())
                        .with_prompt(format!("Approve {path}?"))
                        .default(false)
                        .interact()?;
                    if approve {
                        selected.push(path.clone());
                    }
                }
            }
            1 => {
                for path in candidates {
                    if !selected.contains(path) {
                        println!("{path}");
                    }
                }
            }
            _ => break,
        }
    }

    if selected.is_empty() {
        warn!("interactive review selected nothing");
    }
    Ok(selected)
}

fn interactive_allowed() -> bool {
    if is_ci() {
        return false;
    }
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

fn is_ci() -> bool {
    ["CI", "GITHUB_ACTIONS", "TF_BUILD"]
        .iter()
        .any(|var| std::env::var_os(var).is_some())
}
