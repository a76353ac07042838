//! # feature-lifecycle
//!
//! Command-line driver around `lifecycle-core`: rule configuration, the
//! `.features/` record store, and dashboard and graph rendering.
//!
//! The library target exists so integration tests can drive the same
//! commands the binary runs.

pub mod cli;
pub mod config;
pub mod render;
pub mod store;
