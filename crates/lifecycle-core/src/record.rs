//! # Feature Records
//!
//! The persisted shape of one feature and the aggregate index.
//!
//! Records are values: changing a manual override produces a new record,
//! and the classifiers only ever read the override as input. Reading and
//! writing records is left to the caller.

use crate::graph::DependencySource;
use crate::regression::LastScan;
use crate::{Facts, HealthResult, HealthStatus, Stage};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version written into records and the index.
pub const FORMAT_VERSION: &str = "1.0";

/// Status given to newly registered features.
pub const STATUS_ACTIVE: &str = "active";

fn format_version() -> String {
    FORMAT_VERSION.to_string()
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Identity fields supplied when a feature is first registered.
///
/// On later scans the stored record's owner, status, dependencies, tags,
/// manual override and creation date win over these.
///
/// `scanned_at` is the caller's clock reading for this scan. Without it the
/// record's dates are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeatureIdentity {
    pub feature_id: String,
    pub title: String,
    pub owner: String,
    pub scanned_at: Option<DateTime<Utc>>,
}

impl FeatureIdentity {
    /// Identify a feature by id and title.
    #[must_use]
    pub fn new(feature_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            feature_id: feature_id.into(),
            title: title.into(),
            owner: String::new(),
            scanned_at: None,
        }
    }

    /// Set the default owner for a new record.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Set the time of the scan.
    #[must_use]
    pub fn with_scan_time(mut self, scanned_at: DateTime<Utc>) -> Self {
        self.scanned_at = Some(scanned_at);
        self
    }

    /// Calendar date of the scan, if a scan time was given.
    #[must_use]
    pub fn scan_date(&self) -> Option<NaiveDate> {
        self.scanned_at.map(|at| at.date_naive())
    }
}

// =============================================================================
// FEATURE RECORD
// =============================================================================

/// Computed lifecycle of a feature.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Lifecycle {
    pub stage: Stage,
    /// Date the feature entered `stage`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_since: Option<NaiveDate>,
    pub progress: f64,
    /// Human-set stage. Kept as written; an unknown name is ignored by the
    /// stage classifier.
    pub manual_override: Option<String>,
}

/// Everything stored about one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(default = "format_version")]
    pub feature_version: String,
    pub feature_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub owner: String,
    /// Date of the first scan. Kept across rescans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<NaiveDate>,
    /// Date of the latest change to the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<NaiveDate>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub lifecycle: Lifecycle,
    #[serde(default)]
    pub artifacts: Facts,
    #[serde(default)]
    pub health: HealthResult,
    #[serde(default)]
    pub last_scan: Option<LastScan>,
}

impl FeatureRecord {
    /// A record for a feature that has never been scanned.
    #[must_use]
    pub fn new(identity: &FeatureIdentity) -> Self {
        Self {
            feature_version: format_version(),
            feature_id: identity.feature_id.clone(),
            title: identity.title.clone(),
            status: STATUS_ACTIVE.to_string(),
            owner: identity.owner.clone(),
            created: identity.scan_date(),
            updated: identity.scan_date(),
            depends_on: Vec::new(),
            tags: Vec::new(),
            lifecycle: Lifecycle::default(),
            artifacts: Facts::default(),
            health: HealthResult::default(),
            last_scan: None,
        }
    }

    /// The stored override, if any.
    #[must_use]
    pub fn manual_override(&self) -> Option<&str> {
        self.lifecycle.manual_override.as_deref()
    }

    /// Copy of this record with the override set to `stage`.
    #[must_use]
    pub fn with_manual_override(&self, stage: Stage) -> Self {
        let mut record = self.clone();
        record.lifecycle.manual_override = Some(stage.name().to_string());
        record
    }

    /// Copy of this record without an override.
    #[must_use]
    pub fn without_manual_override(&self) -> Self {
        let mut record = self.clone();
        record.lifecycle.manual_override = None;
        record
    }

    /// Copy of this record marked as changed on `date`.
    #[must_use]
    pub fn touched(&self, date: NaiveDate) -> Self {
        let mut record = self.clone();
        record.updated = Some(date);
        record
    }

    /// Copy of this record with new dependencies.
    #[must_use]
    pub fn with_dependencies(&self, depends_on: Vec<String>) -> Self {
        let mut record = self.clone();
        record.depends_on = depends_on;
        record
    }

    /// Summary row for the aggregate index.
    #[must_use]
    pub fn index_entry(&self) -> IndexEntry {
        IndexEntry {
            feature_id: self.feature_id.clone(),
            title: self.title.clone(),
            stage: self.lifecycle.stage,
            progress: self.lifecycle.progress,
            health: self.health.overall,
            status: if self.status.is_empty() {
                STATUS_ACTIVE.to_string()
            } else {
                self.status.clone()
            },
        }
    }
}

impl DependencySource for FeatureRecord {
    fn feature_id(&self) -> &str {
        &self.feature_id
    }

    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }
}

// =============================================================================
// FEATURE INDEX
// =============================================================================

/// One row of the aggregate index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub feature_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub stage: Stage,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub health: HealthStatus,
    #[serde(default)]
    pub status: String,
}

/// All registered features, sorted by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureIndex {
    #[serde(default = "format_version")]
    pub version: String,
    /// Date of the latest upsert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<NaiveDate>,
    #[serde(default)]
    pub features: Vec<IndexEntry>,
}

impl Default for FeatureIndex {
    fn default() -> Self {
        Self {
            version: format_version(),
            updated: None,
            features: Vec::new(),
        }
    }
}

impl FeatureIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the sorted, one-entry-per-id shape after loading an index
    /// that may have been edited by hand. The last entry for an id wins.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let mut by_id: BTreeMap<String, IndexEntry> = BTreeMap::new();
        for entry in self.features.drain(..) {
            by_id.insert(entry.feature_id.clone(), entry);
        }
        self.features = by_id.into_values().collect();
        self
    }

    /// Insert or replace the entry for `entry.feature_id`, keeping the
    /// entries sorted by id.
    pub fn upsert(&mut self, entry: IndexEntry) {
        match self
            .features
            .binary_search_by(|e| e.feature_id.as_str().cmp(entry.feature_id.as_str()))
        {
            Ok(pos) => self.features[pos] = entry,
            Err(pos) => self.features.insert(pos, entry),
        }
    }

    /// Look up an entry by feature id.
    #[must_use]
    pub fn get(&self, feature_id: &str) -> Option<&IndexEntry> {
        self.features.iter().find(|e| e.feature_id == feature_id)
    }

    /// Number of indexed features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// True if no feature is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
