//! End-to-end pipeline tests: fingerprint, diff, persist, approve, scan.

use repogate::config::RepoConfig;
use repogate::diff::diff_manifests;
use repogate::ledger::{ApprovalLedger, Category};
use repogate::manifest::ManifestBuilder;
use repogate::scanner::report::ComplianceReport;
use repogate::scanner::{Scanner, MSG_IMAGE_SUSPICIOUS_NAME, MSG_IMAGE_UNAPPROVED};
use repogate::state::StateStore;
use repogate::types::{RunStatus, Severity};
use std::path::Path;
use tempfile::TempDir;

fn touch(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn seed_repo(root: &Path) {
    touch(root, "README.md", b"# Course notes\n");
    touch(root, "notes/week01/intro.md", b"Welcome to week one.\n");
    touch(root, "notes/week01/fig.png", b"\x89PNG fake bytes");
    touch(root, "glossary/terms.md", b"- term: definition\n");
}

#[test]
fn first_scan_adds_everything_and_second_scan_is_quiet() {
    let dir = TempDir::new().unwrap();
    seed_repo(dir.path());
    let config = RepoConfig::default();

    let store = StateStore::new(dir.path().join(config.state_file()));
    let manifest = ManifestBuilder::new(dir.path())
        .with_walk_config(config.manifest_walk_config())
        .build()
        .unwrap();

    let first = diff_manifests(&store.load_or_empty(), &manifest);
    assert_eq!(first.added.len(), 4);
    assert!(first.removed.is_empty());
    assert!(first.modified.is_empty());
    store.save(&manifest).unwrap();

    // Nothing changed on disk, so the next run must report nothing. The
    // state file lives under an excluded directory and never shows up.
    let manifest = ManifestBuilder::new(dir.path())
        .with_walk_config(config.manifest_walk_config())
        .build()
        .unwrap();
    let second = diff_manifests(&store.load_or_empty(), &manifest);
    assert!(second.is_empty(), "unexpected diff: {second:?}");
}

#[test]
fn edits_adds_and_deletes_show_up_as_a_diff() {
    let dir = TempDir::new().unwrap();
    seed_repo(dir.path());
    let config = RepoConfig::default();

    let store = StateStore::new(dir.path().join(config.state_file()));
    let manifest = ManifestBuilder::new(dir.path())
        .with_walk_config(config.manifest_walk_config())
        .build()
        .unwrap();
    store.save(&manifest).unwrap();

    touch(dir.path(), "notes/week01/intro.md", b"Welcome back.\n");
    touch(dir.path(), "notes/week02/new.md", b"Week two.\n");
    std::fs::remove_file(dir.path().join("glossary/terms.md")).unwrap();

    let manifest = ManifestBuilder::new(dir.path())
        .with_walk_config(config.manifest_walk_config())
        .build()
        .unwrap();
    let diff = diff_manifests(&store.load_or_empty(), &manifest);
    assert_eq!(diff.added, vec!["notes/week02/new.md"]);
    assert_eq!(diff.removed, vec!["glossary/terms.md"]);
    assert_eq!(diff.modified, vec!["notes/week01/intro.md"]);
}

#[test]
fn approval_survives_until_the_content_changes() {
    let dir = TempDir::new().unwrap();
    seed_repo(dir.path());
    let config = RepoConfig::default();
    let ledger_path = dir.path().join(config.ledger_file());

    // Unapproved image warns.
    let ledger = ApprovalLedger::open(&ledger_path);
    let findings = Scanner::new(dir.path(), &config.scan, &ledger).scan();
    assert!(findings
        .iter()
        .any(|f| f.path == "notes/week01/fig.png" && f.message == MSG_IMAGE_UNAPPROVED));

    // Approve and persist; a fresh scan downgrades it.
    let mut ledger = ApprovalLedger::open(&ledger_path);
    ledger
        .approve_file(dir.path(), "notes/week01/fig.png", Category::Image, None)
        .unwrap();
    ledger.save().unwrap();

    let ledger = ApprovalLedger::open(&ledger_path);
    let findings = Scanner::new(dir.path(), &config.scan, &ledger).scan();
    let image: Vec<_> = findings
        .iter()
        .filter(|f| f.path == "notes/week01/fig.png")
        .collect();
    assert_eq!(image.len(), 1);
    assert_eq!(image[0].severity, Severity::Info);

    // Overwriting the file invalidates the pinned digest; the warning is
    // back without any ledger mutation.
    touch(dir.path(), "notes/week01/fig.png", b"different bytes");
    let findings = Scanner::new(dir.path(), &config.scan, &ledger).scan();
    assert!(findings
        .iter()
        .any(|f| f.path == "notes/week01/fig.png" && f.message == MSG_IMAGE_UNAPPROVED));
}

#[test]
fn suspicious_image_name_fails_even_with_approval() {
    let dir = TempDir::new().unwrap();
    seed_repo(dir.path());
    touch(dir.path(), "notes/gradebook_export.png", b"screenshot");
    let config = RepoConfig::default();

    let mut ledger = ApprovalLedger::empty(dir.path().join(config.ledger_file()));
    ledger
        .approve_file(dir.path(), "notes/gradebook_export.png", Category::Image, None)
        .unwrap();

    let findings = Scanner::new(dir.path(), &config.scan, &ledger).scan();
    let hits: Vec<_> = findings
        .iter()
        .filter(|f| f.path == "notes/gradebook_export.png")
        .collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].severity, Severity::Error);
    assert_eq!(hits[0].message, MSG_IMAGE_SUSPICIOUS_NAME);

    let report = ComplianceReport::from_findings(findings);
    assert_eq!(report.status, RunStatus::Fail);
    assert_eq!(report.exit_code(false), 2);
}

#[test]
fn keyword_rules_are_scoped_to_content_roots() {
    let dir = TempDir::new().unwrap();
    seed_repo(dir.path());
    touch(
        dir.path(),
        "notes/week03/review.md",
        b"Here are the Final Exam Questions from last year.\n",
    );
    touch(
        dir.path(),
        "COMPLIANCE.md",
        b"Never post final exam questions or answer keys.\n",
    );
    let config = RepoConfig::default();

    let ledger = ApprovalLedger::empty(dir.path().join(config.ledger_file()));
    let findings = Scanner::new(dir.path(), &config.scan, &ledger).scan();

    let inside: Vec<_> = findings
        .iter()
        .filter(|f| f.path == "notes/week03/review.md")
        .collect();
    assert_eq!(inside.len(), 1);
    assert_eq!(inside[0].severity, Severity::Warn);
    assert_eq!(inside[0].message, "Possible exam/test content reference.");

    // The policy document mentions the same phrases but sits outside the
    // content roots, so it draws no findings at all.
    assert!(!findings.iter().any(|f| f.path == "COMPLIANCE.md"));
}

#[test]
fn full_run_report_aggregates_to_the_worst_severity() {
    let dir = TempDir::new().unwrap();
    seed_repo(dir.path());
    touch(dir.path(), "notes/week04/leak.md", b"answer key attached\n");
    let config = RepoConfig::default();

    let ledger = ApprovalLedger::empty(dir.path().join(config.ledger_file()));
    let findings = Scanner::new(dir.path(), &config.scan, &ledger).scan();
    let report = ComplianceReport::from_findings(findings);

    assert_eq!(report.status, RunStatus::Fail);
    assert!(report.counts.error >= 1);
    assert!(report.counts.warn >= 1); // unapproved image, missing files
    assert_eq!(report.counts.total, report.findings.len());
}
