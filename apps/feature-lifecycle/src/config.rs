//! # Rule Configuration
//!
//! Loads the stage and health rules from `.features/config.toml`.
//!
//! ```toml
//! default_owner = "platform-team"
//!
//! [stages.spec]
//! requires_any = ["bmad.prd", "speckit.spec"]
//!
//! [stages.implement]
//! requires_all = ["speckit.tasks"]
//! condition = "tasks_completion > 0"
//!
//! [health]
//! critical_when = ["agreement.check == FAIL"]
//! warning_when = ["spec_completeness < 0.5"]
//! ```
//!
//! A missing file means built-in rules. A section left out of the file
//! falls back to its built-in rules; a section present replaces them
//! entirely. Unknown keys and unknown stage names are rejected here so the
//! classifiers only ever see well-formed rules.

use lifecycle_core::{HealthRules, LifecycleError, RuleSet, StageRules};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the rule configuration inside the features directory.
pub const CONFIG_FILE: &str = "config.toml";

/// On-disk layout of the configuration file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    default_owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stages: Option<StageRules>,
    #[serde(skip_serializing_if = "Option::is_none")]
    health: Option<HealthRules>,
}

/// Effective configuration for one run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    /// Owner given to features registered without a stored record.
    pub default_owner: String,
    pub rules: RuleSet,
}

impl Config {
    /// Parse configuration text.
    pub fn parse(text: &str) -> Result<Self, LifecycleError> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| LifecycleError::Config(e.to_string()))?;

        Ok(Self {
            default_owner: file.default_owner,
            rules: RuleSet::new(
                file.stages.unwrap_or_else(RuleSet::default_stages),
                file.health.unwrap_or_else(RuleSet::default_health),
            ),
        })
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, LifecycleError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            LifecycleError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let config = Self::parse(&text)?;
        tracing::debug!(
            path = %path.display(),
            stage_rules = config.rules.stages.iter().count(),
            critical_rules = config.rules.health.critical_when.len(),
            warning_rules = config.rules.health.warning_when.len(),
            "Loaded rule configuration"
        );
        Ok(config)
    }

    /// Load configuration if the file exists, else fall back to built-in rules.
    pub fn load_or_default(path: &Path) -> Result<Self, LifecycleError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using built-in rules");
            Ok(Self::default())
        }
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, LifecycleError> {
        let file = ConfigFile {
            default_owner: self.default_owner.clone(),
            stages: Some(self.rules.stages.clone()),
            health: Some(self.rules.health.clone()),
        };
        toml::to_string_pretty(&file).map_err(|e| LifecycleError::Serialization(e.to_string()))
    }

    /// Write the configuration, refusing to replace an existing file unless forced.
    pub fn write(&self, path: &Path, force: bool) -> Result<(), LifecycleError> {
        if path.exists() && !force {
            return Err(LifecycleError::Config(format!(
                "'{}' already exists. Use --force to overwrite.",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LifecycleError::Io(format!("Create '{}': {}", parent.display(), e))
            })?;
        }
        std::fs::write(path, self.to_toml()?)
            .map_err(|e| LifecycleError::Io(format!("Write '{}': {}", path.display(), e)))
    }
}

// =============================================================================
// TESTS
// =============================================================================
