//! # Assessor
//!
//! One scan of one feature: stage, health and regression in a single pass,
//! merged into a new [`FeatureRecord`].
//!
//! The previous record supplies the manual override, the last scan to diff
//! against, and the identity fields a human may have edited (owner, status,
//! dependencies, tags, creation date). Regression warnings are appended
//! after the health rule messages and do not change the overall health.
//!
//! Dates come from [`FeatureIdentity::scanned_at`]; the assessor never reads
//! a clock.

use crate::record::{FeatureIdentity, FeatureRecord, Lifecycle};
use crate::regression::{LastScan, Snapshot, regression_warnings};
use crate::{Facts, RuleSet};

/// Pure scan-to-record pass over an immutable rule set.
#[derive(Debug, Clone, Default)]
pub struct Assessor {
    rules: RuleSet,
}

impl Assessor {
    /// Create an assessor for a rule set.
    #[must_use]
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// The rules in use.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Assess fresh facts and produce the next record for the feature.
    #[must_use]
    pub fn assess(
        &self,
        identity: &FeatureIdentity,
        facts: Facts,
        previous: Option<&FeatureRecord>,
    ) -> FeatureRecord {
        let mut record = match previous {
            Some(prev) => carry_identity(identity, prev),
            None => FeatureRecord::new(identity),
        };

        let result = self
            .rules
            .stages
            .classify(&facts, record.manual_override());

        let mut health = self.rules.health.classify(&facts);
        let snapshot = Snapshot::from_facts(&facts);
        health.warnings.extend(regression_warnings(
            result.stage,
            &snapshot,
            previous.and_then(|prev| prev.last_scan.as_ref()),
        ));

        let scan_date = identity.scan_date();
        let stage_since = match previous {
            Some(prev) if prev.lifecycle.stage == result.stage => {
                prev.lifecycle.stage_since.or(scan_date)
            }
            _ => scan_date,
        };

        record.lifecycle = Lifecycle {
            stage: result.stage,
            stage_since,
            progress: result.progress,
            manual_override: record.lifecycle.manual_override.take(),
        };
        record.artifacts = facts;
        record.health = health;
        record.last_scan = Some(LastScan::new(result.stage, snapshot).at(identity.scanned_at));
        record
    }
}

/// Start the next record from the previous one's human-owned fields.
fn carry_identity(identity: &FeatureIdentity, previous: &FeatureRecord) -> FeatureRecord {
    let mut record = FeatureRecord::new(identity);

    if identity.title.is_empty() {
        record.title = previous.title.clone();
    }
    if !previous.owner.is_empty() {
        record.owner = previous.owner.clone();
    }
    if !previous.status.is_empty() {
        record.status = previous.status.clone();
    }
    if previous.created.is_some() {
        record.created = previous.created;
    }
    if record.updated.is_none() {
        record.updated = previous.updated;
    }
    record.depends_on = previous.depends_on.clone();
    record.tags = previous.tags.clone();
    record.lifecycle.manual_override = previous.lifecycle.manual_override.clone();
    record
}

// =============================================================================
// TESTS
// =============================================================================
