//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::Config;
use crate::render::{Filter, dashboard_rows, render_dashboard, render_mermaid};
use crate::store::{FeatureStore, read_json, validate_feature_id};
use chrono::Utc;
use lifecycle_core::{
    Assessor, Facts, FeatureIdentity, FeatureRecord, LifecycleError, Stage, detect_cycles,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Pretty-print a value as JSON on stdout.
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), LifecycleError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| LifecycleError::Serialization(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Write the built-in rules to the configuration file.
pub fn cmd_init(config_path: &Path, force: bool, json: bool) -> Result<(), LifecycleError> {
    Config::default().write(config_path, force)?;
    tracing::info!(path = %config_path.display(), "Wrote default rule configuration");

    if json {
        return print_json(&serde_json::json!({
            "config": config_path.to_string_lossy(),
        }));
    }

    println!("Initialized rule configuration at {}", config_path.display());
    Ok(())
}

// =============================================================================
// RULES COMMAND
// =============================================================================

/// Show the effective rule set.
pub fn cmd_rules(config: &Config, json: bool) -> Result<(), LifecycleError> {
    if json {
        return print_json(&config.rules);
    }
    print!("{}", config.to_toml()?);
    Ok(())
}

// =============================================================================
// ASSESS COMMAND
// =============================================================================

/// Read the fact snapshot file as `(feature_id, facts)` pairs.
///
/// With `feature` set the whole file is that feature's facts; otherwise the
/// file maps feature ids to facts.
pub fn read_fact_batch(
    path: &Path,
    feature: Option<&str>,
) -> Result<Vec<(String, Facts)>, LifecycleError> {
    match feature {
        Some(id) => Ok(vec![(id.to_string(), read_json::<Facts>(path)?)]),
        None => Ok(read_json::<BTreeMap<String, Facts>>(path)?
            .into_iter()
            .collect()),
    }
}

/// Assess every feature in the fact file against its stored record.
///
/// Nothing is written unless every feature id in the batch is valid and
/// every stored record loads.
pub fn cmd_assess(
    store: &FeatureStore,
    config: &Config,
    facts_path: &Path,
    feature: Option<&str>,
    title: Option<&str>,
    json: bool,
) -> Result<(), LifecycleError> {
    let batch = read_fact_batch(facts_path, feature)?;
    for (feature_id, _) in &batch {
        validate_feature_id(feature_id)?;
    }

    let assessor = Assessor::new(config.rules.clone());
    let scanned_at = Utc::now();
    let mut assessed = Vec::with_capacity(batch.len());

    for (feature_id, facts) in batch {
        let previous = store.load(&feature_id)?;
        let title = match (title, &previous) {
            (Some(title), _) => title.to_string(),
            (None, Some(_)) => String::new(),
            (None, None) => feature_id.clone(),
        };
        let identity = FeatureIdentity::new(feature_id.as_str(), title)
            .with_owner(&config.default_owner)
            .with_scan_time(scanned_at);

        let record = assessor.assess(&identity, facts, previous.as_ref());
        for warning in &record.health.warnings {
            tracing::warn!(feature = %record.feature_id, "{}", warning);
        }
        tracing::info!(
            feature = %record.feature_id,
            stage = %record.lifecycle.stage,
            health = %record.health.overall,
            "Assessed feature"
        );
        assessed.push(record);
    }

    for record in &assessed {
        store.save(record)?;
    }

    if json {
        return print_json(&assessed);
    }

    for record in &assessed {
        print_summary(record);
    }
    Ok(())
}

fn print_summary(record: &FeatureRecord) {
    println!(
        "{}: {} {:.0}% {}",
        record.feature_id,
        record.lifecycle.stage,
        record.lifecycle.progress * 100.0,
        record.health.overall
    );
    for warning in &record.health.warnings {
        println!("  - {}", warning);
    }
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show one feature in detail.
pub fn cmd_status(store: &FeatureStore, feature_id: &str, json: bool) -> Result<(), LifecycleError> {
    let record = store.get(feature_id)?;

    if json {
        return print_json(&record);
    }

    let lifecycle = &record.lifecycle;
    let health = &record.health;

    println!("Feature {}", record.feature_id);
    println!("{}", "=".repeat("Feature ".len() + record.feature_id.len()));
    println!("Title:   {}", record.title);
    println!("Status:  {}", record.status);
    if !record.owner.is_empty() {
        println!("Owner:   {}", record.owner);
    }
    if let Some(created) = record.created {
        println!("Created: {}", created);
    }
    if let Some(updated) = record.updated {
        println!("Updated: {}", updated);
    }
    println!();
    print!("Stage:   {} ({:.0}%)", lifecycle.stage, lifecycle.progress * 100.0);
    match lifecycle.manual_override.as_deref() {
        Some(pinned) => println!(" [override: {}]", pinned),
        None => println!(),
    }
    if let Some(since) = lifecycle.stage_since {
        println!("Since:   {}", since);
    }
    match lifecycle.stage.next() {
        Some(next) => println!("Next:    {}", next),
        None => println!("Terminal stage reached"),
    }
    println!();
    println!("Health:  {}", health.overall);
    println!("  Agreement:         {}", health.agreement);
    println!("  Spec completeness: {:.0}%", health.spec_completeness * 100.0);
    println!("  Task progress:     {:.0}%", health.task_progress * 100.0);
    println!("  ADRs:              {}", health.adr_coverage);
    println!("  Diagrams:          {}", health.diagram_coverage);

    if !record.depends_on.is_empty() {
        println!();
        println!("Depends on: {}", record.depends_on.join(", "));
    }
    if !record.tags.is_empty() {
        println!("Tags:       {}", record.tags.join(", "));
    }
    if !health.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &health.warnings {
            println!("  - {}", warning);
        }
    }

    Ok(())
}

// =============================================================================
// LIST COMMAND
// =============================================================================

/// Show the dashboard of stored features.
pub fn cmd_list(store: &FeatureStore, filter: &Filter, json: bool) -> Result<(), LifecycleError> {
    let records = store.records()?;
    let rows = dashboard_rows(&filter.apply(&records));
    tracing::debug!(total = records.len(), shown = rows.len(), "Listing features");

    if json {
        return print_json(&serde_json::json!({ "features": rows }));
    }

    print!("{}", render_dashboard(&rows));
    Ok(())
}

// =============================================================================
// GRAPH COMMAND
// =============================================================================

/// Show dependency cycles and the Mermaid dependency graph.
pub fn cmd_graph(store: &FeatureStore, json: bool) -> Result<(), LifecycleError> {
    let records = store.records()?;
    let cycles = detect_cycles(&records);
    for cycle in &cycles {
        tracing::warn!("Circular dependency: {}", cycle.join(" → "));
    }

    let mermaid = render_mermaid(&records);
    if json {
        return print_json(&serde_json::json!({
            "cycles": cycles,
            "mermaid": mermaid,
        }));
    }

    print!("{}", mermaid);
    Ok(())
}

// =============================================================================
// OVERRIDE COMMAND
// =============================================================================

/// Set (`Some`) or clear (`None`) a manual override, then re-stage the
/// feature from its stored facts.
pub fn cmd_override(
    store: &FeatureStore,
    config: &Config,
    feature_id: &str,
    stage: Option<Stage>,
    json: bool,
) -> Result<(), LifecycleError> {
    let record = store.get(feature_id)?;
    let pinned = match stage {
        Some(stage) => record.with_manual_override(stage),
        None => record.without_manual_override(),
    };

    let identity = FeatureIdentity::new(pinned.feature_id.as_str(), pinned.title.as_str())
        .with_scan_time(Utc::now());
    let updated = Assessor::new(config.rules.clone()).assess(
        &identity,
        pinned.artifacts.clone(),
        Some(&pinned),
    );
    store.save(&updated)?;

    match stage {
        Some(stage) => tracing::info!(feature = feature_id, %stage, "Manual override set"),
        None => tracing::info!(feature = feature_id, "Manual override cleared"),
    }

    if json {
        return print_json(&updated);
    }
    print_summary(&updated);
    Ok(())
}

// =============================================================================
// DEPENDS COMMAND
// =============================================================================

/// Replace a feature's dependencies and report any cycle it now sits on.
pub fn cmd_depends(
    store: &FeatureStore,
    feature_id: &str,
    deps: Vec<String>,
    json: bool,
) -> Result<(), LifecycleError> {
    let updated = store
        .get(feature_id)?
        .with_dependencies(deps)
        .touched(Utc::now().date_naive());
    store.save(&updated)?;

    let cycles: Vec<Vec<String>> = detect_cycles(&store.records()?)
        .into_iter()
        .filter(|cycle| cycle.iter().any(|id| id == feature_id))
        .collect();
    for cycle in &cycles {
        tracing::warn!("Circular dependency: {}", cycle.join(" → "));
    }

    if json {
        return print_json(&serde_json::json!({
            "feature_id": updated.feature_id,
            "depends_on": updated.depends_on,
            "cycles": cycles,
        }));
    }

    if updated.depends_on.is_empty() {
        println!("{} has no dependencies", updated.feature_id);
    } else {
        println!(
            "{} depends on {}",
            updated.feature_id,
            updated.depends_on.join(", ")
        );
    }
    Ok(())
}
