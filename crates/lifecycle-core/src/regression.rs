//! # Regression Module
//!
//! Drift detection between two scans of the same feature.
//!
//! - Stage regression: the stage moved backwards in the stage order
//! - Artifact disappearance: a tracked artifact was present and is gone
//!
//! Artifacts that were never present produce nothing. Absence is not a
//! regression; disappearance is.

use crate::{Facts, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Fixed boolean projection of the facts, kept between scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub bmad_prd: bool,
    pub speckit_spec: bool,
    pub speckit_plan: bool,
    pub speckit_tasks: bool,
    pub agreement_exists: bool,
}

impl Snapshot {
    /// Project a fact snapshot.
    #[must_use]
    pub fn from_facts(facts: &Facts) -> Self {
        Self {
            bmad_prd: facts.bmad.prd,
            speckit_spec: facts.speckit.spec,
            speckit_plan: facts.speckit.plan,
            speckit_tasks: facts.speckit.tasks,
            agreement_exists: facts.agreement.exists,
        }
    }

    /// Tracked artifacts with their display labels, in reporting order.
    #[must_use]
    pub fn tracked(&self) -> [(&'static str, bool); 5] {
        [
            ("BMAD PRD", self.bmad_prd),
            ("SpecKit spec.md", self.speckit_spec),
            ("SpecKit plan.md", self.speckit_plan),
            ("SpecKit tasks.md", self.speckit_tasks),
            ("Agreement", self.agreement_exists),
        ]
    }
}

// =============================================================================
// LAST SCAN
// =============================================================================

/// What the previous scan recorded.
///
/// The stage is kept as written so a hand-edited or outdated record with an
/// unknown stage name degrades to "no comparison" instead of failing to load.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LastScan {
    /// When the scan ran, as supplied by the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub stage: String,
    pub artifacts_snapshot: Option<Snapshot>,
}

impl LastScan {
    /// Record the outcome of a scan.
    #[must_use]
    pub fn new(stage: Stage, snapshot: Snapshot) -> Self {
        Self {
            timestamp: None,
            stage: stage.name().to_string(),
            artifacts_snapshot: Some(snapshot),
        }
    }

    /// Stamp the scan with the time it ran.
    #[must_use]
    pub fn at(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

// =============================================================================
// DETECTORS
// =============================================================================

/// Warn when `current` is lower than the stage of the last scan.
#[must_use]
pub fn detect_regression(current: Stage, last_scan: Option<&LastScan>) -> Vec<String> {
    let Some(previous) = last_scan.and_then(|scan| Stage::from_name(&scan.stage)) else {
        return Vec::new();
    };

    if current < previous {
        vec![format!("Stage regression detected: {} → {}", previous, current)]
    } else {
        Vec::new()
    }
}

/// Warn for every tracked artifact that was present and no longer is.
#[must_use]
pub fn compare_snapshots(current: &Snapshot, previous: &Snapshot) -> Vec<String> {
    current
        .tracked()
        .into_iter()
        .zip(previous.tracked())
        .filter(|((_, now), (_, before))| *before && !*now)
        .map(|((label, _), _)| format!("Artifact disappeared: {}", label))
        .collect()
}

/// Run both detectors against the last scan, stage warnings first.
#[must_use]
pub fn regression_warnings(
    current_stage: Stage,
    current: &Snapshot,
    last_scan: Option<&LastScan>,
) -> Vec<String> {
    let mut warnings = detect_regression(current_stage, last_scan);
    if let Some(previous) = last_scan.and_then(|scan| scan.artifacts_snapshot.as_ref()) {
        warnings.extend(compare_snapshots(current, previous));
    }
    warnings
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(stage: &str) -> LastScan {
        LastScan {
            stage: stage.to_string(),
            ..LastScan::default()
        }
    }

    #[test]
    fn backwards_stage_warns() {
        let warnings = detect_regression(Stage::Spec, Some(&scan("implement")));
        assert_eq!(
            warnings,
            vec!["Stage regression detected: implement → spec".to_string()]
        );
    }

    #[test]
    fn forward_or_same_stage_is_silent() {
        assert!(detect_regression(Stage::Release, Some(&scan("spec"))).is_empty());
        assert!(detect_regression(Stage::Plan, Some(&scan("plan"))).is_empty());
    }

    #[test]
    fn missing_or_unknown_previous_stage_is_silent() {
        assert!(detect_regression(Stage::Ideation, None).is_empty());
        assert!(detect_regression(Stage::Ideation, Some(&scan(""))).is_empty());
        assert!(detect_regression(Stage::Ideation, Some(&scan("shipping"))).is_empty());
    }

    #[test]
    fn disappeared_agreement_warns_once() {
        let previous = Snapshot {
            agreement_exists: true,
            ..Snapshot::default()
        };
        let warnings = compare_snapshots(&Snapshot::default(), &previous);
        assert_eq!(warnings, vec!["Artifact disappeared: Agreement".to_string()]);

        assert!(compare_snapshots(&previous, &previous).is_empty());
    }

    #[test]
    fn never_present_is_not_a_regression() {
        let current = Snapshot {
            speckit_spec: true,
            ..Snapshot::default()
        };
        assert!(compare_snapshots(&current, &Snapshot::default()).is_empty());
    }

    #[test]
    fn disappearances_follow_fixed_order() {
        let previous = Snapshot {
            bmad_prd: true,
            speckit_spec: true,
            speckit_plan: true,
            speckit_tasks: true,
            agreement_exists: true,
        };
        let current = Snapshot {
            speckit_spec: true,
            ..Snapshot::default()
        };
        assert_eq!(
            compare_snapshots(&current, &previous),
            vec![
                "Artifact disappeared: BMAD PRD".to_string(),
                "Artifact disappeared: SpecKit plan.md".to_string(),
                "Artifact disappeared: SpecKit tasks.md".to_string(),
                "Artifact disappeared: Agreement".to_string(),
            ]
        );
    }

    #[test]
    fn combined_warnings_put_stage_first() {
        let last = LastScan::new(
            Stage::Tasks,
            Snapshot {
                speckit_tasks: true,
                ..Snapshot::default()
            },
        );
        let warnings = regression_warnings(Stage::Plan, &Snapshot::default(), Some(&last));
        assert_eq!(
            warnings,
            vec![
                "Stage regression detected: tasks → plan".to_string(),
                "Artifact disappeared: SpecKit tasks.md".to_string(),
            ]
        );
    }

    #[test]
    fn snapshot_projects_facts() {
        let mut facts = Facts::new();
        facts.bmad.prd = true;
        facts.agreement.exists = true;
        facts.speckit.research = true;

        let snapshot = Snapshot::from_facts(&facts);
        assert!(snapshot.bmad_prd);
        assert!(snapshot.agreement_exists);
        assert!(!snapshot.speckit_spec);
    }
}
