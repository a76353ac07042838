//! # Stage Classification
//!
//! Resolves the single lifecycle stage of a feature and its progress.
//!
//! ## Stage Order
//!
//! | Stage | Progress |
//! |-------|----------|
//! | ideation | 0.0 |
//! | spec | 0.1 |
//! | plan | 0.2 |
//! | tasks | 0.3 |
//! | implement | 0.3 + 0.5 × task completion |
//! | test | 0.9 |
//! | release | 1.0 |
//!
//! Rules only decide *whether* a stage is reached. Progress is a fixed
//! function of the resolved stage and cannot be configured.
//!
//! ## Resolution
//!
//! A valid manual override wins outright. Otherwise stages are tried from
//! `release` down to `ideation` and the first matching rule wins; stages
//! whose rule is `requires_manual` are never reached automatically. With no
//! match the feature sits at `ideation`.

use crate::expr::{Bindings, Expression};
use crate::{Facts, LifecycleError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Variable exposed to stage `condition` expressions.
pub const TASKS_COMPLETION: &str = "tasks_completion";

// =============================================================================
// STAGE ENUM
// =============================================================================

/// Lifecycle stages, totally ordered from `Ideation` to `Release`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Ideation,
    Spec,
    Plan,
    Tasks,
    Implement,
    Test,
    Release,
}

impl Stage {
    /// Every stage, lowest first.
    pub const ALL: [Stage; 7] = [
        Stage::Ideation,
        Stage::Spec,
        Stage::Plan,
        Stage::Tasks,
        Stage::Implement,
        Stage::Test,
        Stage::Release,
    ];

    /// Get the stage name as written in rules and records.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Ideation => "ideation",
            Stage::Spec => "spec",
            Stage::Plan => "plan",
            Stage::Tasks => "tasks",
            Stage::Implement => "implement",
            Stage::Test => "test",
            Stage::Release => "release",
        }
    }

    /// Position in the stage order, `0` for `Ideation`.
    #[must_use]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Look up a stage by name. Exact, lowercase match only.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Stage> {
        Self::ALL.into_iter().find(|stage| stage.name() == name)
    }

    /// Get the next stage, if any.
    #[must_use]
    pub fn next(&self) -> Option<Stage> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// Get the previous stage, if any.
    #[must_use]
    pub fn previous(&self) -> Option<Stage> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    /// Check if this stage is terminal (`Release`).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Release)
    }

    /// Progress associated with this stage.
    ///
    /// `tasks_completion` only matters for `Implement`; it is clamped to
    /// `[0, 1]`.
    #[must_use]
    pub fn progress(&self, tasks_completion: f64) -> f64 {
        match self {
            Stage::Ideation => 0.0,
            Stage::Spec => 0.1,
            Stage::Plan => 0.2,
            Stage::Tasks => 0.3,
            Stage::Implement => 0.3 + 0.5 * tasks_completion.clamp(0.0, 1.0),
            Stage::Test => 0.9,
            Stage::Release => 1.0,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Stage {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::from_name(s).ok_or_else(|| LifecycleError::UnknownStage(s.to_string()))
    }
}

// =============================================================================
// STAGE RULES
// =============================================================================

/// Participation criteria for one stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StageRule {
    /// Fact paths that must all be truthy.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requires_all: Vec<String>,

    /// Fact paths of which at least one must be truthy.
    ///
    /// An explicitly empty list can never be satisfied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_any: Option<Vec<String>>,

    /// Expression over `tasks_completion`. Blank conditions are ignored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expression>,

    /// Stage can only be entered through a manual override.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub requires_manual: bool,
}

impl StageRule {
    /// Rule requiring every listed fact path.
    #[must_use]
    pub fn all(paths: &[&str]) -> Self {
        Self {
            requires_all: paths.iter().map(|p| (*p).to_string()).collect(),
            ..Self::default()
        }
    }

    /// Rule requiring at least one listed fact path.
    #[must_use]
    pub fn any(paths: &[&str]) -> Self {
        Self {
            requires_any: Some(paths.iter().map(|p| (*p).to_string()).collect()),
            ..Self::default()
        }
    }

    /// Rule that is only reachable manually.
    #[must_use]
    pub fn manual() -> Self {
        Self {
            requires_manual: true,
            ..Self::default()
        }
    }

    /// Add a condition expression.
    #[must_use]
    pub fn with_condition(mut self, condition: &str) -> Self {
        self.condition = Some(Expression::parse(condition));
        self
    }

    /// Check the rule against facts, ignoring `requires_manual`.
    #[must_use]
    pub fn matches(&self, facts: &Facts, bindings: &Bindings) -> bool {
        if !self.requires_all.iter().all(|path| facts.resolve(path)) {
            return false;
        }

        if let Some(any) = &self.requires_any
            && !any.iter().any(|path| facts.resolve(path))
        {
            return false;
        }

        match &self.condition {
            Some(condition) if !condition.is_blank() => condition.evaluate(bindings),
            _ => true,
        }
    }
}

/// Stage → rule mapping.
///
/// Keys are stage names on the wire; unknown names are rejected when the
/// mapping is deserialized.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, StageRule>",
    into = "BTreeMap<String, StageRule>"
)]
pub struct StageRules {
    rules: BTreeMap<Stage, StageRule>,
}

impl StageRules {
    /// Create an empty rule set (everything resolves to `ideation`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the rule for a stage.
    #[must_use]
    pub fn with_rule(mut self, stage: Stage, rule: StageRule) -> Self {
        self.rules.insert(stage, rule);
        self
    }

    /// Get the rule for a stage.
    #[must_use]
    pub fn get(&self, stage: Stage) -> Option<&StageRule> {
        self.rules.get(&stage)
    }

    /// Iterate rules in stage order.
    pub fn iter(&self) -> impl Iterator<Item = (Stage, &StageRule)> {
        self.rules.iter().map(|(stage, rule)| (*stage, rule))
    }

    /// Resolve stage and progress.
    ///
    /// `manual_override` is raw input: a value that is not a stage name is
    /// ignored and resolution falls through to the rules.
    #[must_use]
    pub fn classify(&self, facts: &Facts, manual_override: Option<&str>) -> LifecycleResult {
        let tasks_completion = facts.speckit.tasks_completion();

        if let Some(stage) = manual_override.and_then(Stage::from_name) {
            return LifecycleResult::new(stage, tasks_completion);
        }

        let bindings = Bindings::new().with_number(TASKS_COMPLETION, tasks_completion);

        let stage = Stage::ALL
            .into_iter()
            .rev()
            .find(|stage| {
                self.rules.get(stage).is_some_and(|rule| {
                    !rule.requires_manual && rule.matches(facts, &bindings)
                })
            })
            .unwrap_or(Stage::Ideation);

        LifecycleResult::new(stage, tasks_completion)
    }
}

impl TryFrom<BTreeMap<String, StageRule>> for StageRules {
    type Error = LifecycleError;

    fn try_from(raw: BTreeMap<String, StageRule>) -> Result<Self, Self::Error> {
        let mut rules = BTreeMap::new();
        for (name, rule) in raw {
            rules.insert(name.parse::<Stage>()?, rule);
        }
        Ok(Self { rules })
    }
}

impl From<StageRules> for BTreeMap<String, StageRule> {
    fn from(rules: StageRules) -> Self {
        rules
            .rules
            .into_iter()
            .map(|(stage, rule)| (stage.name().to_string(), rule))
            .collect()
    }
}

// =============================================================================
// LIFECYCLE RESULT
// =============================================================================

/// Resolved stage and its progress in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifecycleResult {
    pub stage: Stage,
    pub progress: f64,
}

impl LifecycleResult {
    fn new(stage: Stage, tasks_completion: f64) -> Self {
        Self {
            stage,
            progress: stage.progress(tasks_completion),
        }
    }
}

/// Resolve stage and progress from facts, rules and an optional override.
#[must_use]
pub fn compute_stage(
    facts: &Facts,
    rules: &StageRules,
    manual_override: Option<&str>,
) -> LifecycleResult {
    rules.classify(facts, manual_override)
}

// =============================================================================
// TESTS
// =============================================================================
