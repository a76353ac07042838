//! # Core Type Definitions
//!
//! This module contains the fact model the engine classifies:
//! - Per-family artifact facts (`BmadFacts`, `SpeckitFacts`, ...)
//! - The aggregate fact snapshot (`Facts`) with dotted-path resolution
//! - Error types (`LifecycleError`)
//!
//! ## Missing Means False
//!
//! Every field defaults to its falsy/zero value. Scanners that find no
//! artifact simply leave the field at its default, and the engine never
//! distinguishes "absent" from "explicitly false". Deserialization follows
//! the same rule: any missing key takes its default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

// =============================================================================
// ARTIFACT FAMILIES
// =============================================================================

/// Planning artifacts produced by the BMAD workflow.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BmadFacts {
    pub prd: bool,
    pub architecture: bool,
    pub epics: bool,
}

/// Specification artifacts produced by SpecKit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeckitFacts {
    pub spec: bool,
    pub plan: bool,
    pub research: bool,
    pub tasks: bool,
    pub contracts: bool,
    /// Checked task boxes in `tasks.md`.
    pub tasks_done: u32,
    /// All task boxes in `tasks.md`, checked or not.
    pub tasks_total: u32,
}

impl SpeckitFacts {
    /// Fraction of declared tasks that are done, in `[0, 1]`.
    ///
    /// Zero when no tasks are declared. Capped at 1 if a scanner ever
    /// reports more done tasks than declared ones.
    #[must_use]
    pub fn tasks_completion(&self) -> f64 {
        if self.tasks_total == 0 {
            return 0.0;
        }
        (f64::from(self.tasks_done) / f64::from(self.tasks_total)).min(1.0)
    }

    /// Fraction of the five SpecKit documents that exist.
    #[must_use]
    pub fn completeness(&self) -> f64 {
        let documents = [
            self.spec,
            self.plan,
            self.research,
            self.tasks,
            self.contracts,
        ];
        let present = documents.iter().filter(|present| **present).count();
        present as f64 / documents.len() as f64
    }
}

/// Verdict of the agreement check report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgreementCheck {
    Pass,
    Fail,
    #[default]
    Missing,
}

impl AgreementCheck {
    /// The token used in rule expressions and records.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AgreementCheck::Pass => "PASS",
            AgreementCheck::Fail => "FAIL",
            AgreementCheck::Missing => "MISSING",
        }
    }
}

impl std::fmt::Display for AgreementCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The feature agreement and the verdict of its last check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgreementFacts {
    pub exists: bool,
    pub status: String,
    pub check: AgreementCheck,
}

/// Architecture decision records referencing the feature.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdrFacts {
    pub count: u32,
    /// Unique ADR identifiers, ordered for deterministic output.
    pub ids: BTreeSet<String>,
}

/// Diagram counts per abstraction layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MermaidLayers {
    #[serde(rename = "L0")]
    pub l0: u32,
    #[serde(rename = "L1")]
    pub l1: u32,
    #[serde(rename = "L2")]
    pub l2: u32,
}

/// Mermaid diagrams drawn for the feature.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MermaidFacts {
    pub count: u32,
    pub layers: MermaidLayers,
}

/// QA plan and verdict. Informational: no rule variable reads it yet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QaFacts {
    pub plan_exists: bool,
    pub verdict: Option<String>,
    pub verdict_fresh: bool,
    pub passed: u32,
    pub failed: u32,
    pub total: u32,
}

// =============================================================================
// FACT SNAPSHOT
// =============================================================================

/// Everything known about one feature's artifacts at scan time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Facts {
    pub bmad: BmadFacts,
    pub speckit: SpeckitFacts,
    pub agreement: AgreementFacts,
    pub adr: AdrFacts,
    pub mermaid: MermaidFacts,
    pub qa: QaFacts,
}

impl Facts {
    /// Create an empty snapshot (every artifact absent).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a dotted fact path (`"speckit.tasks"`) to its truthiness.
    ///
    /// Numbers are truthy when non-zero, strings and collections when
    /// non-empty, and the agreement check when it is not `MISSING`.
    /// Unknown paths and paths that stop at a namespace resolve to `false`.
    #[must_use]
    pub fn resolve(&self, path: &str) -> bool {
        let segments: Vec<&str> = path.trim().split('.').collect();

        match segments.as_slice() {
            ["bmad", "prd"] => self.bmad.prd,
            ["bmad", "architecture"] => self.bmad.architecture,
            ["bmad", "epics"] => self.bmad.epics,

            ["speckit", "spec"] => self.speckit.spec,
            ["speckit", "plan"] => self.speckit.plan,
            ["speckit", "research"] => self.speckit.research,
            ["speckit", "tasks"] => self.speckit.tasks,
            ["speckit", "contracts"] => self.speckit.contracts,
            ["speckit", "tasks_done"] => self.speckit.tasks_done > 0,
            ["speckit", "tasks_total"] => self.speckit.tasks_total > 0,

            ["agreement", "exists"] => self.agreement.exists,
            ["agreement", "status"] => !self.agreement.status.is_empty(),
            ["agreement", "check"] => self.agreement.check != AgreementCheck::Missing,

            ["adr", "count"] => self.adr.count > 0,
            ["adr", "ids"] => !self.adr.ids.is_empty(),

            ["mermaid", "count"] => self.mermaid.count > 0,
            ["mermaid", "layers", "L0"] => self.mermaid.layers.l0 > 0,
            ["mermaid", "layers", "L1"] => self.mermaid.layers.l1 > 0,
            ["mermaid", "layers", "L2"] => self.mermaid.layers.l2 > 0,

            ["qa", "plan_exists"] => self.qa.plan_exists,
            ["qa", "verdict"] => self.qa.verdict.as_deref().is_some_and(|v| !v.is_empty()),
            ["qa", "verdict_fresh"] => self.qa.verdict_fresh,
            ["qa", "passed"] => self.qa.passed > 0,
            ["qa", "failed"] => self.qa.failed > 0,
            ["qa", "total"] => self.qa.total > 0,

            _ => false,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised around the engine.
///
/// The classifiers themselves never fail: every degenerate input has a
/// policy outcome. These variants cover configuration loading and record
/// persistence done by callers.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Rule configuration does not have the expected shape.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A stage name outside the stage order was supplied where one is required.
    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    /// No stored record exists for the requested feature.
    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    /// A feature id that cannot name a record (empty, or path-like).
    #[error("Invalid feature id: {0:?}")]
    InvalidFeatureId(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_facts_resolve_false() {
        let facts = Facts::new();
        for path in [
            "bmad.prd",
            "speckit.tasks",
            "agreement.exists",
            "agreement.check",
            "adr.ids",
            "mermaid.layers.L1",
            "qa.verdict",
        ] {
            assert!(!facts.resolve(path), "{path} should be falsy");
        }
    }

    #[test]
    fn resolve_reads_leaf_values() {
        let mut facts = Facts::new();
        facts.speckit.tasks = true;
        facts.speckit.tasks_total = 4;
        facts.agreement.check = AgreementCheck::Fail;
        facts.mermaid.layers.l2 = 1;

        assert!(facts.resolve("speckit.tasks"));
        assert!(facts.resolve("speckit.tasks_total"));
        assert!(!facts.resolve("speckit.tasks_done"));
        assert!(facts.resolve("agreement.check"));
        assert!(facts.resolve("mermaid.layers.L2"));
    }

    #[test]
    fn resolve_misses_are_false() {
        let mut facts = Facts::new();
        facts.bmad.prd = true;

        assert!(!facts.resolve("bmad"));
        assert!(!facts.resolve("bmad.prd.extra"));
        assert!(!facts.resolve("nope.prd"));
        assert!(!facts.resolve(""));
    }

    #[test]
    fn tasks_completion_handles_zero_and_overflow() {
        let mut speckit = SpeckitFacts::default();
        assert!(speckit.tasks_completion().abs() < f64::EPSILON);

        speckit.tasks_done = 5;
        speckit.tasks_total = 10;
        assert!((speckit.tasks_completion() - 0.5).abs() < f64::EPSILON);

        speckit.tasks_done = 12;
        assert!((speckit.tasks_completion() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn completeness_counts_documents() {
        let speckit = SpeckitFacts {
            spec: true,
            plan: true,
            ..SpeckitFacts::default()
        };
        assert!((speckit.completeness() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn missing_keys_deserialize_to_defaults() {
        let facts: Facts =
            serde_json::from_str(r#"{"speckit":{"spec":true},"agreement":{"check":"PASS"}}"#)
                .expect("parse");

        assert!(facts.speckit.spec);
        assert!(!facts.speckit.plan);
        assert_eq!(facts.agreement.check, AgreementCheck::Pass);
        assert_eq!(facts.adr, AdrFacts::default());
    }

    #[test]
    fn mermaid_layers_use_uppercase_keys() {
        let facts: Facts =
            serde_json::from_str(r#"{"mermaid":{"count":3,"layers":{"L0":1,"L1":2}}}"#)
                .expect("parse");
        assert_eq!(facts.mermaid.layers.l0, 1);
        assert_eq!(facts.mermaid.layers.l1, 2);
        assert_eq!(facts.mermaid.layers.l2, 0);
    }
}
