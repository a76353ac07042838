//! # Record Store
//!
//! JSON persistence for feature records and the aggregate index.
//!
//! ```text
//! <root>/.features/
//! ├── config.toml
//! ├── index.json
//! └── <feature_id>/
//!     └── feature.json
//! ```
//!
//! Every record write also upserts the record's entry into `index.json`.

use crate::config::CONFIG_FILE;
use lifecycle_core::{FeatureIndex, FeatureRecord, LifecycleError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Directory under the project root that holds all tracker state.
pub const FEATURES_DIR: &str = ".features";

const INDEX_FILE: &str = "index.json";
const RECORD_FILE: &str = "feature.json";

/// Maximum size of any file the store reads (10 MB).
const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Handle on the `.features/` directory of one project.
#[derive(Debug, Clone)]
pub struct FeatureStore {
    dir: PathBuf,
}

impl FeatureStore {
    /// Open the store of the project at `root`. Nothing is created until a write.
    pub fn open(root: &Path) -> Self {
        Self {
            dir: root.join(FEATURES_DIR),
        }
    }

    /// The `.features/` directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Default location of the rule configuration.
    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    /// Location of the index file.
    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// Location of a feature's record.
    pub fn record_path(&self, feature_id: &str) -> Result<PathBuf, LifecycleError> {
        validate_feature_id(feature_id)?;
        Ok(self.dir.join(feature_id).join(RECORD_FILE))
    }

    // =========================================================================
    // RECORDS
    // =========================================================================

    /// Load a feature's record if one has been stored.
    pub fn load(&self, feature_id: &str) -> Result<Option<FeatureRecord>, LifecycleError> {
        let path = self.record_path(feature_id)?;
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    /// Load a feature's record, failing when none is stored.
    pub fn get(&self, feature_id: &str) -> Result<FeatureRecord, LifecycleError> {
        self.load(feature_id)?
            .ok_or_else(|| LifecycleError::FeatureNotFound(feature_id.to_string()))
    }

    /// Write a record and upsert its index entry.
    pub fn save(&self, record: &FeatureRecord) -> Result<(), LifecycleError> {
        let path = self.record_path(&record.feature_id)?;
        write_json(&path, record)?;

        let mut index = self.load_index()?;
        index.upsert(record.index_entry());
        if record.updated.is_some() {
            index.updated = record.updated;
        }
        write_json(&self.index_path(), &index)?;

        tracing::debug!(
            feature = %record.feature_id,
            stage = %record.lifecycle.stage,
            health = %record.health.overall,
            "Saved feature record"
        );
        Ok(())
    }

    /// All indexed records in feature id order.
    ///
    /// An index entry whose record file has gone missing is skipped with a
    /// warning.
    pub fn records(&self) -> Result<Vec<FeatureRecord>, LifecycleError> {
        let index = self.load_index()?;
        let mut records = Vec::with_capacity(index.len());
        for entry in &index.features {
            match self.load(&entry.feature_id)? {
                Some(record) => records.push(record),
                None => tracing::warn!(
                    feature = %entry.feature_id,
                    "Indexed feature has no record file"
                ),
            }
        }
        Ok(records)
    }

    // =========================================================================
    // INDEX
    // =========================================================================

    /// Load the index, or an empty one when none has been written.
    ///
    /// Entries come back sorted by id with one entry per id, whatever order
    /// the file holds them in.
    pub fn load_index(&self) -> Result<FeatureIndex, LifecycleError> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(FeatureIndex::new());
        }
        read_json::<FeatureIndex>(&path).map(FeatureIndex::normalized)
    }
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Feature ids become directory names: reject anything that could escape
/// the features directory.
pub fn validate_feature_id(feature_id: &str) -> Result<(), LifecycleError> {
    let valid = !feature_id.is_empty()
        && feature_id != "."
        && feature_id != ".."
        && !feature_id.contains(['/', '\\'])
        && !feature_id.chars().any(char::is_control);
    if valid {
        Ok(())
    } else {
        Err(LifecycleError::InvalidFeatureId(feature_id.to_string()))
    }
}

/// Read and parse a JSON file, refusing oversized input.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LifecycleError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| LifecycleError::Io(format!("Cannot read '{}': {}", path.display(), e)))?;
    if metadata.len() > MAX_FILE_SIZE {
        return Err(LifecycleError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_FILE_SIZE
        )));
    }

    let data = std::fs::read(path)
        .map_err(|e| LifecycleError::Io(format!("Read '{}': {}", path.display(), e)))?;
    serde_json::from_slice(&data)
        .map_err(|e| LifecycleError::Serialization(format!("{}: {}", path.display(), e)))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), LifecycleError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| LifecycleError::Io(format!("Create '{}': {}", parent.display(), e)))?;
    }
    let mut data = serde_json::to_vec_pretty(value)
        .map_err(|e| LifecycleError::Serialization(e.to_string()))?;
    data.push(b'\n');
    std::fs::write(path, &data)
        .map_err(|e| LifecycleError::Io(format!("Write '{}': {}", path.display(), e)))
}

// =============================================================================
// TESTS
// =============================================================================
