//! # Rendering
//!
//! Text and JSON views over stored records: the dashboard table, list
//! filters, and the Mermaid dependency graph.

use lifecycle_core::{
    AgreementCheck, FeatureRecord, HealthStatus, Stage, detect_cycles,
};
use serde::Serialize;

// =============================================================================
// FILTERS
// =============================================================================

/// Criteria for `list`. Every set criterion must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub stage: Option<Stage>,
    pub health: Option<HealthStatus>,
    pub tag: Option<String>,
}

impl Filter {
    /// Whether a record passes every set criterion.
    pub fn matches(&self, record: &FeatureRecord) -> bool {
        self.stage.is_none_or(|stage| record.lifecycle.stage == stage)
            && self
                .health
                .is_none_or(|health| record.health.overall == health)
            && self
                .tag
                .as_ref()
                .is_none_or(|tag| record.tags.contains(tag))
    }

    /// Keep the records that match, in their original order.
    pub fn apply<'a>(&self, records: &'a [FeatureRecord]) -> Vec<&'a FeatureRecord> {
        records.iter().filter(|record| self.matches(record)).collect()
    }
}

// =============================================================================
// DASHBOARD
// =============================================================================

/// One dashboard line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardRow {
    pub feature_id: String,
    pub title: String,
    pub stage: Stage,
    pub progress: f64,
    pub health: HealthStatus,
    pub agreement: AgreementCheck,
}

impl From<&FeatureRecord> for DashboardRow {
    fn from(record: &FeatureRecord) -> Self {
        Self {
            feature_id: record.feature_id.clone(),
            title: record.title.clone(),
            stage: record.lifecycle.stage,
            progress: record.lifecycle.progress,
            health: record.health.overall,
            agreement: record.health.agreement,
        }
    }
}

/// Build dashboard rows for records.
pub fn dashboard_rows(records: &[&FeatureRecord]) -> Vec<DashboardRow> {
    records.iter().map(|record| DashboardRow::from(*record)).collect()
}

/// Render rows as a Markdown table.
pub fn render_dashboard(rows: &[DashboardRow]) -> String {
    let count = rows.len();
    let mut out = format!(
        "## Feature Dashboard — {} feature{}\n\n",
        count,
        if count == 1 { "" } else { "s" }
    );
    out.push_str("| ID | Title | Stage | Progress | Health | Agreement |\n");
    out.push_str("|----|-------|-------|----------|--------|-----------|\n");

    for row in rows {
        out.push_str(&format!(
            "| {} | {} | {} | {}% | {} | {} |\n",
            row.feature_id,
            row.title,
            row.stage,
            percent(row.progress),
            row.health,
            row.agreement
        ));
    }
    out
}

fn percent(progress: f64) -> u32 {
    (progress * 100.0).round().clamp(0.0, 100.0) as u32
}

// =============================================================================
// MERMAID GRAPH
// =============================================================================

/// Mermaid class for a node: CRITICAL wins, else by stage.
fn node_class(record: &FeatureRecord) -> &'static str {
    if record.health.overall == HealthStatus::Critical {
        return "red";
    }
    match record.lifecycle.stage {
        Stage::Release => "green",
        Stage::Test | Stage::Implement => "blue",
        Stage::Ideation | Stage::Spec | Stage::Plan | Stage::Tasks => "yellow",
    }
}

/// Mermaid-safe node id: every non-alphanumeric character becomes `_`.
fn node_id(feature_id: &str) -> String {
    feature_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Render the dependency graph as a Mermaid flowchart with frontmatter.
///
/// Edges point from the dependency to the dependent. Detected cycles are
/// listed as comments above the nodes.
pub fn render_mermaid(records: &[FeatureRecord]) -> String {
    let cycles = detect_cycles(records);
    let mut lines: Vec<String> = vec![
        "---".into(),
        "id: dependency-graph".into(),
        "title: Feature Dependencies".into(),
        "type: flowchart".into(),
        "layer: L0".into(),
        "---".into(),
        String::new(),
        "flowchart TD".into(),
    ];

    if !cycles.is_empty() {
        lines.push(format!(
            "  %% WARNING: {} circular dependency(ies) detected",
            cycles.len()
        ));
        for cycle in &cycles {
            lines.push(format!("  %% Cycle: {}", cycle.join(" → ")));
        }
        lines.push(String::new());
    }

    for record in records {
        let title = if record.title.is_empty() {
            &record.feature_id
        } else {
            &record.title
        };
        lines.push(format!(
            "  {}[\"{}<br/>{} {}%\"]",
            node_id(&record.feature_id),
            title.replace('"', "#quot;"),
            record.lifecycle.stage,
            percent(record.lifecycle.progress)
        ));
    }
    lines.push(String::new());

    for record in records {
        let id = node_id(&record.feature_id);
        for dep in &record.depends_on {
            lines.push(format!("  {} --> {}", node_id(dep), id));
        }
    }
    lines.push(String::new());

    lines.push("  classDef green fill:#2ecc71,color:#fff".into());
    lines.push("  classDef blue fill:#3498db,color:#fff".into());
    lines.push("  classDef yellow fill:#f1c40f,color:#333".into());
    lines.push("  classDef red fill:#e74c3c,color:#fff".into());
    lines.push(String::new());

    for record in records {
        lines.push(format!(
            "  class {} {}",
            node_id(&record.feature_id),
            node_class(record)
        ));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

// =============================================================================
// TESTS
// =============================================================================
