//! # Feature Lifecycle CLI Module
//!
//! This module implements the CLI interface for the tracker.
//!
//! ## Available Commands
//!
//! - `init` - Write the default rule configuration
//! - `rules` - Show the effective rule set
//! - `assess` - Assess features from a fact snapshot file
//! - `status` - Show one feature in detail
//! - `list` - Show the feature dashboard
//! - `graph` - Show dependency cycles and the Mermaid graph
//! - `override` - Set or clear a manual stage override
//! - `depends` - Replace a feature's dependencies

mod commands;

use crate::config::Config;
use crate::render::Filter;
use crate::store::FeatureStore;
use clap::{Parser, Subcommand};
use lifecycle_core::{HealthStatus, LifecycleError, Stage};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Feature Lifecycle - rule-driven stage and health tracking
///
/// Classifies each feature into a lifecycle stage from the artifacts that
/// exist for it, grades its health, and flags regressions between scans.
#[derive(Parser, Debug)]
#[command(name = "feature-lifecycle")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Project root containing the .features directory
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Rule configuration file [default: <root>/.features/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the default rule configuration
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective rule set
    Rules,

    /// Assess features from a fact snapshot file
    Assess {
        /// JSON file: one fact object, or an object keyed by feature id
        #[arg(short = 'f', long)]
        facts: PathBuf,

        /// Treat the file as the facts of this single feature
        #[arg(long)]
        feature: Option<String>,

        /// Title for a newly registered feature
        #[arg(short, long, requires = "feature")]
        title: Option<String>,
    },

    /// Show one feature in detail
    Status {
        /// Feature id
        id: String,
    },

    /// Show the feature dashboard
    List {
        /// Only features in this stage
        #[arg(short, long)]
        stage: Option<String>,

        /// Only features with this health (HEALTHY, WARNING, CRITICAL)
        #[arg(short = 'H', long)]
        health: Option<String>,

        /// Only features carrying this tag
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Show dependency cycles and the Mermaid dependency graph
    Graph,

    /// Set or clear a manual stage override
    Override {
        /// Feature id
        id: String,

        /// Stage to pin the feature to
        #[arg(required_unless_present = "clear")]
        stage: Option<String>,

        /// Remove the override and return to rule-based staging
        #[arg(long, conflicts_with = "stage")]
        clear: bool,
    },

    /// Replace a feature's dependencies
    Depends {
        /// Feature id
        id: String,

        /// Feature ids this feature depends on (none clears them)
        deps: Vec<String>,
    },
}

impl Cli {
    /// Default log filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "feature_lifecycle=debug"
        } else if self.quiet {
            "feature_lifecycle=warn"
        } else {
            "feature_lifecycle=info"
        }
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), LifecycleError> {
    let store = FeatureStore::open(&cli.root);
    let config_path = cli.config.clone().unwrap_or_else(|| store.config_path());
    let json = cli.json;

    let Some(command) = cli.command else {
        // No subcommand - show the dashboard by default
        return cmd_list(&store, &Filter::default(), json);
    };

    match command {
        Commands::Init { force } => cmd_init(&config_path, force, json),
        Commands::Rules => cmd_rules(&Config::load_or_default(&config_path)?, json),
        Commands::Assess {
            facts,
            feature,
            title,
        } => cmd_assess(
            &store,
            &Config::load_or_default(&config_path)?,
            &facts,
            feature.as_deref(),
            title.as_deref(),
            json,
        ),
        Commands::Status { id } => cmd_status(&store, &id, json),
        Commands::List { stage, health, tag } => {
            let filter = Filter {
                stage: stage.as_deref().map(str::parse::<Stage>).transpose()?,
                health: health.as_deref().map(parse_health).transpose()?,
                tag,
            };
            cmd_list(&store, &filter, json)
        }
        Commands::Graph => cmd_graph(&store, json),
        Commands::Override { id, stage, clear } => {
            let stage = if clear {
                None
            } else {
                stage.as_deref().map(str::parse::<Stage>).transpose()?
            };
            cmd_override(
                &store,
                &Config::load_or_default(&config_path)?,
                &id,
                stage,
                json,
            )
        }
        Commands::Depends { id, deps } => cmd_depends(&store, &id, deps, json),
    }
}

fn parse_health(name: &str) -> Result<HealthStatus, LifecycleError> {
    HealthStatus::from_name(name)
        .ok_or_else(|| LifecycleError::Config(format!("Unknown health status: {}", name)))
}
