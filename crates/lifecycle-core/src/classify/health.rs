//! # Health Classification
//!
//! Derives coverage metrics from facts and runs the configured
//! `critical_when` / `warning_when` expressions against them.
//!
//! Severity only escalates within one evaluation: once a critical rule has
//! fired, later warning matches still add messages but cannot lower the
//! overall status.

use crate::expr::{Bindings, Expression};
use crate::{AgreementCheck, Facts};
use serde::{Deserialize, Serialize};

/// Text variable: the agreement check verdict (`PASS`, `FAIL`, `MISSING`).
pub const AGREEMENT_CHECK: &str = "agreement.check";

/// Numeric variable: fraction of SpecKit documents present.
pub const SPEC_COMPLETENESS: &str = "spec_completeness";

/// Numeric variable: number of ADRs referencing the feature.
pub const ADR_COVERAGE: &str = "adr_coverage";

// =============================================================================
// HEALTH STATUS
// =============================================================================

/// Overall health, ordered by severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    #[default]
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    /// Get the status token used in records and dashboards.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "HEALTHY",
            HealthStatus::Warning => "WARNING",
            HealthStatus::Critical => "CRITICAL",
        }
    }

    /// Look up a status by token, case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<HealthStatus> {
        [
            HealthStatus::Healthy,
            HealthStatus::Warning,
            HealthStatus::Critical,
        ]
        .into_iter()
        .find(|status| status.as_str().eq_ignore_ascii_case(name))
    }

    /// Raise to `other` if it is more severe. Never lowers.
    #[must_use]
    pub fn escalate(self, other: HealthStatus) -> HealthStatus {
        self.max(other)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// HEALTH RULES
// =============================================================================

/// Ordered health expressions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthRules {
    pub critical_when: Vec<Expression>,
    pub warning_when: Vec<Expression>,
}

impl HealthRules {
    /// Create an empty rule set (everything is healthy).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a critical rule.
    #[must_use]
    pub fn critical(mut self, rule: &str) -> Self {
        self.critical_when.push(Expression::parse(rule));
        self
    }

    /// Append a warning rule.
    #[must_use]
    pub fn warning(mut self, rule: &str) -> Self {
        self.warning_when.push(Expression::parse(rule));
        self
    }

    /// Evaluate every rule against the facts.
    #[must_use]
    pub fn classify(&self, facts: &Facts) -> HealthResult {
        let spec_completeness = facts.speckit.completeness();
        let task_progress = facts.speckit.tasks_completion();
        let adr_coverage = facts.adr.count;

        let bindings = Bindings::new()
            .with_text(AGREEMENT_CHECK, facts.agreement.check.as_str())
            .with_number(SPEC_COMPLETENESS, spec_completeness)
            .with_number(ADR_COVERAGE, f64::from(adr_coverage));

        let mut overall = HealthStatus::Healthy;
        let mut warnings = Vec::new();

        for rule in self.critical_when.iter().filter(|r| r.evaluate(&bindings)) {
            overall = overall.escalate(HealthStatus::Critical);
            warnings.push(format!("CRITICAL: {}", rule));
        }

        for rule in self.warning_when.iter().filter(|r| r.evaluate(&bindings)) {
            overall = overall.escalate(HealthStatus::Warning);
            warnings.push(format!("WARNING: {}", rule));
        }

        HealthResult {
            overall,
            agreement: facts.agreement.check,
            spec_completeness: round2(spec_completeness),
            task_progress: round2(task_progress),
            adr_coverage,
            diagram_coverage: facts.mermaid.count,
            warnings,
        }
    }
}

// =============================================================================
// HEALTH RESULT
// =============================================================================

/// Health verdict with its supporting metrics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthResult {
    pub overall: HealthStatus,
    pub agreement: AgreementCheck,
    pub spec_completeness: f64,
    pub task_progress: f64,
    pub adr_coverage: u32,
    pub diagram_coverage: u32,
    /// `CRITICAL: ...` messages first, then `WARNING: ...`, in rule order.
    pub warnings: Vec<String>,
}

/// Round to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Classify health from facts and rules.
#[must_use]
pub fn compute_health(facts: &Facts, rules: &HealthRules) -> HealthResult {
    rules.classify(facts)
}

// =============================================================================
// TESTS
// =============================================================================
