//! End-to-end tests of the CLI commands against a temporary project root.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use feature_lifecycle::cli::{Cli, execute};
use feature_lifecycle::config::Config;
use feature_lifecycle::store::FeatureStore;
use lifecycle_core::{HealthStatus, LifecycleError, Stage, detect_cycles};
use std::path::Path;
use tempfile::TempDir;

const TWO_FEATURES: &str = r#"{
  "002-search": {
    "speckit": {"spec": true}
  },
  "001-login": {
    "speckit": {"spec": true, "plan": true, "tasks": true, "tasks_done": 5, "tasks_total": 10},
    "agreement": {"exists": true, "check": "PASS"},
    "adr": {"count": 2, "ids": ["ADR-001", "ADR-002"]}
  }
}"#;

fn run(root: &Path, args: &[&str]) -> Result<(), LifecycleError> {
    let mut argv = vec!["feature-lifecycle", "--quiet", "--root"];
    let root = root.to_str().unwrap();
    argv.push(root);
    argv.extend_from_slice(args);
    execute(Cli::try_parse_from(argv).unwrap())
}

fn write_facts(dir: &TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, body).unwrap();
    path.to_str().unwrap().to_string()
}

// =============================================================================
// INIT
// =============================================================================

#[test]
fn test_init_writes_default_config_once() {
    let dir = TempDir::new().unwrap();
    run(dir.path(), &["init"]).unwrap();

    let store = FeatureStore::open(dir.path());
    let config = Config::load(&store.config_path()).unwrap();
    assert_eq!(config, Config::default());

    assert!(matches!(
        run(dir.path(), &["init"]),
        Err(LifecycleError::Config(_))
    ));
    run(dir.path(), &["init", "--force"]).unwrap();
}

// =============================================================================
// ASSESS
// =============================================================================

#[test]
fn test_assess_batch_writes_records_and_sorted_index() {
    let dir = TempDir::new().unwrap();
    let facts = write_facts(&dir, "scan.json", TWO_FEATURES);
    run(dir.path(), &["assess", "--facts", &facts]).unwrap();

    let store = FeatureStore::open(dir.path());
    let index = store.load_index().unwrap();
    let ids: Vec<&str> = index
        .features
        .iter()
        .map(|e| e.feature_id.as_str())
        .collect();
    assert_eq!(ids, vec!["001-login", "002-search"]);

    let login = store.get("001-login").unwrap();
    assert_eq!(login.lifecycle.stage, Stage::Implement);
    assert!((login.lifecycle.progress - 0.55).abs() < 1e-9);
    assert_eq!(login.health.overall, HealthStatus::Healthy);
    assert_eq!(login.title, "001-login");

    let search = store.get("002-search").unwrap();
    assert_eq!(search.lifecycle.stage, Stage::Spec);
    assert_eq!(search.health.overall, HealthStatus::Warning);
}

#[test]
fn test_single_feature_file_with_title() {
    let dir = TempDir::new().unwrap();
    let facts = write_facts(&dir, "one.json", r#"{"bmad": {"prd": true}}"#);
    run(
        dir.path(),
        &["assess", "-f", &facts, "--feature", "007-export", "--title", "Export"],
    )
    .unwrap();

    let record = FeatureStore::open(dir.path()).get("007-export").unwrap();
    assert_eq!(record.title, "Export");
    assert_eq!(record.lifecycle.stage, Stage::Spec);
}

#[test]
fn test_rescan_reports_regression_and_keeps_title() {
    let dir = TempDir::new().unwrap();
    let first = write_facts(&dir, "scan.json", TWO_FEATURES);
    run(dir.path(), &["assess", "--facts", &first]).unwrap();

    let second = write_facts(
        &dir,
        "rescan.json",
        r#"{"speckit": {"spec": true}, "adr": {"count": 2}}"#,
    );
    run(
        dir.path(),
        &["assess", "--facts", &second, "--feature", "001-login"],
    )
    .unwrap();

    let record = FeatureStore::open(dir.path()).get("001-login").unwrap();
    assert_eq!(record.lifecycle.stage, Stage::Spec);
    assert_eq!(record.title, "001-login");
    assert!(
        record
            .health
            .warnings
            .contains(&"Stage regression detected: implement → spec".to_string())
    );
    assert!(
        record
            .health
            .warnings
            .contains(&"Artifact disappeared: Agreement".to_string())
    );
}

#[test]
fn test_rescan_keeps_creation_date() {
    let dir = TempDir::new().unwrap();
    let facts = write_facts(&dir, "scan.json", TWO_FEATURES);
    run(dir.path(), &["assess", "--facts", &facts]).unwrap();

    let store = FeatureStore::open(dir.path());
    let mut first = store.get("001-login").unwrap();
    let created = chrono::NaiveDate::from_ymd_opt(2024, 1, 15);
    first.created = created;
    first.lifecycle.stage_since = created;
    store.save(&first).unwrap();

    run(dir.path(), &["assess", "--facts", &facts]).unwrap();

    let record = store.get("001-login").unwrap();
    assert_eq!(record.created, created);
    assert_eq!(record.lifecycle.stage_since, created);
    assert!(record.updated > created);
    assert!(
        record
            .last_scan
            .as_ref()
            .and_then(|scan| scan.timestamp)
            .is_some()
    );
    assert_eq!(store.load_index().unwrap().updated, record.updated);
}

#[test]
fn test_batch_with_invalid_id_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let facts = write_facts(&dir, "scan.json", TWO_FEATURES);
    run(dir.path(), &["assess", "--facts", &facts]).unwrap();

    let store = FeatureStore::open(dir.path());
    let index_before = std::fs::read_to_string(store.index_path()).unwrap();
    let login_before = store.get("001-login").unwrap();

    let bad = write_facts(
        &dir,
        "bad-batch.json",
        r#"{"001-login": {"speckit": {"spec": true}}, "000-new": {}, "a/b": {}}"#,
    );
    assert!(matches!(
        run(dir.path(), &["assess", "--facts", &bad]),
        Err(LifecycleError::InvalidFeatureId(id)) if id == "a/b"
    ));

    assert_eq!(
        std::fs::read_to_string(store.index_path()).unwrap(),
        index_before
    );
    assert_eq!(store.get("001-login").unwrap(), login_before);
    assert!(store.load("000-new").unwrap().is_none());
}

#[test]
fn test_configured_rules_drive_assessment() {
    let dir = TempDir::new().unwrap();
    let store = FeatureStore::open(dir.path());
    std::fs::create_dir_all(store.dir()).unwrap();
    std::fs::write(
        store.config_path(),
        r#"
default_owner = "core-team"

[stages.plan]
requires_all = ["bmad.architecture"]

[health]
critical_when = ["adr_coverage == 0"]
"#,
    )
    .unwrap();

    let facts = write_facts(&dir, "arch.json", r#"{"bmad": {"architecture": true}}"#);
    run(dir.path(), &["assess", "-f", &facts, "--feature", "003-infra"]).unwrap();

    let record = store.get("003-infra").unwrap();
    assert_eq!(record.lifecycle.stage, Stage::Plan);
    assert_eq!(record.owner, "core-team");
    assert_eq!(record.health.overall, HealthStatus::Critical);
    assert_eq!(record.health.warnings, vec!["CRITICAL: adr_coverage == 0"]);
}

#[test]
fn test_malformed_config_is_rejected_before_assessment() {
    let dir = TempDir::new().unwrap();
    let store = FeatureStore::open(dir.path());
    std::fs::create_dir_all(store.dir()).unwrap();
    std::fs::write(store.config_path(), "[stages.shipped]\nrequires_manual = true\n").unwrap();

    let facts = write_facts(&dir, "one.json", "{}");
    let result = run(dir.path(), &["assess", "-f", &facts, "--feature", "x"]);
    assert!(matches!(result, Err(LifecycleError::Config(_))));
    assert!(!store.index_path().exists());
}

// =============================================================================
// OVERRIDE & DEPENDS
// =============================================================================

#[test]
fn test_override_set_and_clear() {
    let dir = TempDir::new().unwrap();
    let facts = write_facts(&dir, "scan.json", TWO_FEATURES);
    run(dir.path(), &["assess", "--facts", &facts]).unwrap();
    let store = FeatureStore::open(dir.path());

    run(dir.path(), &["override", "001-login", "release"]).unwrap();
    let pinned = store.get("001-login").unwrap();
    assert_eq!(pinned.lifecycle.stage, Stage::Release);
    assert_eq!(pinned.manual_override(), Some("release"));
    assert_eq!(
        store.load_index().unwrap().get("001-login").map(|e| e.stage),
        Some(Stage::Release)
    );

    run(dir.path(), &["override", "001-login", "--clear"]).unwrap();
    let cleared = store.get("001-login").unwrap();
    assert_eq!(cleared.lifecycle.stage, Stage::Implement);
    assert_eq!(cleared.manual_override(), None);
}

#[test]
fn test_override_rejects_unknown_stage() {
    let dir = TempDir::new().unwrap();
    let facts = write_facts(&dir, "scan.json", TWO_FEATURES);
    run(dir.path(), &["assess", "--facts", &facts]).unwrap();

    assert!(matches!(
        run(dir.path(), &["override", "001-login", "shipped"]),
        Err(LifecycleError::UnknownStage(_))
    ));
}

#[test]
fn test_depends_creates_detectable_cycle() {
    let dir = TempDir::new().unwrap();
    let facts = write_facts(&dir, "scan.json", TWO_FEATURES);
    run(dir.path(), &["assess", "--facts", &facts]).unwrap();

    run(dir.path(), &["depends", "001-login", "002-search"]).unwrap();
    run(dir.path(), &["depends", "002-search", "001-login"]).unwrap();

    let records = FeatureStore::open(dir.path()).records().unwrap();
    let cycles = detect_cycles(&records);
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0], vec!["001-login", "002-search", "001-login"]);

    run(dir.path(), &["graph"]).unwrap();
}

#[test]
fn test_dependencies_survive_rescan() {
    let dir = TempDir::new().unwrap();
    let facts = write_facts(&dir, "scan.json", TWO_FEATURES);
    run(dir.path(), &["assess", "--facts", &facts]).unwrap();
    run(dir.path(), &["depends", "002-search", "001-login"]).unwrap();
    run(dir.path(), &["assess", "--facts", &facts]).unwrap();

    let record = FeatureStore::open(dir.path()).get("002-search").unwrap();
    assert_eq!(record.depends_on, vec!["001-login"]);
}

// =============================================================================
// ERRORS
// =============================================================================

#[test]
fn test_status_of_unknown_feature() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        run(dir.path(), &["status", "404-missing"]),
        Err(LifecycleError::FeatureNotFound(_))
    ));
}

#[test]
fn test_list_filters_are_validated() {
    let dir = TempDir::new().unwrap();
    run(dir.path(), &["list"]).unwrap();
    run(dir.path(), &["list", "--health", "warning"]).unwrap();
    assert!(matches!(
        run(dir.path(), &["list", "--stage", "done"]),
        Err(LifecycleError::UnknownStage(_))
    ));
    assert!(matches!(
        run(dir.path(), &["list", "--health", "ok"]),
        Err(LifecycleError::Config(_))
    ));
}

#[test]
fn test_invalid_fact_file() {
    let dir = TempDir::new().unwrap();
    let facts = write_facts(&dir, "bad.json", "{ not json");
    assert!(matches!(
        run(dir.path(), &["assess", "-f", &facts]),
        Err(LifecycleError::Serialization(_))
    ));
}

#[test]
fn test_path_like_feature_id_is_rejected() {
    let dir = TempDir::new().unwrap();
    let facts = write_facts(&dir, "one.json", "{}");
    assert!(matches!(
        run(dir.path(), &["assess", "-f", &facts, "--feature", "../escape"]),
        Err(LifecycleError::InvalidFeatureId(_))
    ));
    assert!(!FeatureStore::open(dir.path()).dir().exists());
}

// =============================================================================
// READ-ONLY COMMANDS
// =============================================================================

#[test]
fn test_read_only_commands_on_empty_project() {
    let dir = TempDir::new().unwrap();
    run(dir.path(), &["rules"]).unwrap();
    run(dir.path(), &["--json", "rules"]).unwrap();
    run(dir.path(), &[]).unwrap();
    run(dir.path(), &["graph", "--json"]).unwrap();

    assert!(!FeatureStore::open(dir.path()).dir().exists());
}
