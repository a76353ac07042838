//! # Feature Lifecycle
//!
//! The binary for the rule-driven feature lifecycle tracker.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │              apps/feature-lifecycle (THE BINARY)           │
//! │                                                            │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────┐    │
//! │  │    CLI      │    │   Config    │    │    Store     │    │
//! │  │   (clap)    │    │   (toml)    │    │ (serde_json) │    │
//! │  └──────┬──────┘    └──────┬──────┘    └──────┬───────┘    │
//! │         │                  │                  │            │
//! │         └──────────────────┼──────────────────┘            │
//! │                            ▼                               │
//! │                   ┌─────────────────┐                      │
//! │                   │ lifecycle-core  │                      │
//! │                   │   (THE LOGIC)   │                      │
//! │                   └─────────────────┘                      │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! feature-lifecycle init
//! feature-lifecycle assess --facts scan.json
//! feature-lifecycle list --stage implement
//! feature-lifecycle override 001-login release
//! feature-lifecycle graph > docs/dependencies.mmd
//! ```

use clap::Parser;
use feature_lifecycle::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // FEATURE_LIFECYCLE_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("FEATURE_LIFECYCLE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_filter().into());

    // Logs go to stderr so stdout stays clean for tables, graphs and JSON.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
