//! # lifecycle-core
//!
//! The Lifecycle Computation Engine for the feature tracker - THE LOGIC.
//!
//! Given the facts observed about one feature's artifacts, this crate
//! decides which lifecycle stage the feature is in, how far along it is,
//! how healthy it looks, and whether anything regressed since the previous
//! scan. Across features it finds dependency cycles for graph rendering.
//!
//! ## Pipeline
//!
//! ```text
//! Facts ──► StageRules::classify ──► LifecycleResult {stage, progress}
//!   │
//!   ├────► HealthRules::classify ──► HealthResult {overall, warnings, ...}
//!   │
//!   └────► Snapshot ──► regression_warnings(previous LastScan)
//!
//! [FeatureRecord] ──► detect_cycles ──► Vec<cycle>
//! ```
//!
//! ## Architectural Constraints
//!
//! - Pure: no I/O, no logging, no clocks, no async
//! - Deterministic: `BTreeMap` only, declaration order preserved
//! - Fail-closed: bad rules never match, they never error
//! - Stateless: rule sets are immutable values shared per invocation

// =============================================================================
// MODULES
// =============================================================================

pub mod assess;
pub mod classify;
pub mod expr;
pub mod graph;
pub mod record;
pub mod regression;
pub mod rules;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AdrFacts, AgreementCheck, AgreementFacts, BmadFacts, Facts, LifecycleError, MermaidFacts,
    MermaidLayers, QaFacts, SpeckitFacts,
};

// =============================================================================
// RE-EXPORTS: Classification
// =============================================================================

pub use classify::{
    HealthResult, HealthRules, HealthStatus, LifecycleResult, Stage, StageRule, StageRules,
    compute_health, compute_stage,
};
pub use expr::{Bindings, Expression, evaluate};
pub use rules::RuleSet;

// =============================================================================
// RE-EXPORTS: Regression & Graph
// =============================================================================

pub use graph::{DependencyGraph, DependencySource, FeatureDeps, detect_cycles};
pub use regression::{LastScan, Snapshot, compare_snapshots, detect_regression};

// =============================================================================
// RE-EXPORTS: Records
// =============================================================================

pub use assess::Assessor;
pub use record::{FeatureIdentity, FeatureIndex, FeatureRecord, IndexEntry, Lifecycle};
