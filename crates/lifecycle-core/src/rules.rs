//! # Rule Set
//!
//! Stage and health rules bundled as one immutable value.
//!
//! A `RuleSet` is built once per run (from configuration or from
//! [`RuleSet::default`]) and shared read-only by every classification.
//! It is `Send + Sync`, so concurrent assessments of different features can
//! share it freely; a reload produces a new value instead of mutating one.

use crate::classify::{HealthRules, Stage, StageRule, StageRules};
use serde::{Deserialize, Serialize};

/// Stage rules plus health rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub stages: StageRules,
    #[serde(default)]
    pub health: HealthRules,
}

impl RuleSet {
    /// Combine stage and health rules.
    #[must_use]
    pub fn new(stages: StageRules, health: HealthRules) -> Self {
        Self { stages, health }
    }

    /// Built-in stage rules.
    ///
    /// `release` is manual only; `implement` and `test` are separated from
    /// `tasks` by how many task boxes are checked.
    #[must_use]
    pub fn default_stages() -> StageRules {
        StageRules::new()
            .with_rule(Stage::Spec, StageRule::any(&["bmad.prd", "speckit.spec"]))
            .with_rule(Stage::Plan, StageRule::all(&["speckit.plan"]))
            .with_rule(Stage::Tasks, StageRule::all(&["speckit.tasks"]))
            .with_rule(
                Stage::Implement,
                StageRule::all(&["speckit.tasks"]).with_condition("tasks_completion > 0"),
            )
            .with_rule(
                Stage::Test,
                StageRule::all(&["speckit.tasks"]).with_condition("tasks_completion >= 1"),
            )
            .with_rule(Stage::Release, StageRule::manual())
    }

    /// Built-in health rules.
    #[must_use]
    pub fn default_health() -> HealthRules {
        HealthRules::new()
            .critical("agreement.check == FAIL")
            .warning("spec_completeness < 0.5")
            .warning("adr_coverage == 0")
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(Self::default_stages(), Self::default_health())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AgreementCheck, Facts, HealthStatus};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn rule_set_is_shareable() {
        assert_send_sync::<RuleSet>();
    }

    #[test]
    fn default_stages_walk_the_lifecycle() {
        let rules = RuleSet::default();
        let mut facts = Facts::new();
        assert_eq!(rules.stages.classify(&facts, None).stage, Stage::Ideation);

        facts.bmad.prd = true;
        assert_eq!(rules.stages.classify(&facts, None).stage, Stage::Spec);

        facts.speckit.spec = true;
        facts.speckit.plan = true;
        assert_eq!(rules.stages.classify(&facts, None).stage, Stage::Plan);

        facts.speckit.tasks = true;
        facts.speckit.tasks_total = 4;
        assert_eq!(rules.stages.classify(&facts, None).stage, Stage::Tasks);

        facts.speckit.tasks_done = 1;
        assert_eq!(rules.stages.classify(&facts, None).stage, Stage::Implement);

        facts.speckit.tasks_done = 4;
        assert_eq!(rules.stages.classify(&facts, None).stage, Stage::Test);

        assert_eq!(
            rules.stages.classify(&facts, Some("release")).stage,
            Stage::Release
        );
    }

    #[test]
    fn default_health_flags_failed_agreement() {
        let mut facts = Facts::new();
        facts.agreement.check = AgreementCheck::Fail;
        let result = RuleSet::default().health.classify(&facts);
        assert_eq!(result.overall, HealthStatus::Critical);
    }

    #[test]
    fn rule_set_round_trips_through_json() {
        let rules = RuleSet::default();
        let json = serde_json::to_string(&rules).expect("serialize");
        let back: RuleSet = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, rules);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let rules: RuleSet = serde_json::from_str("{}").expect("parse");
        assert!(rules.stages.iter().next().is_none());
        assert!(rules.health.critical_when.is_empty());
    }
}
