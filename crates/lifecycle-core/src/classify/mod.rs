//! # Classify Module
//!
//! Stage and health classification.
//!
//! Both classifiers are pure: they read a [`crate::Facts`] snapshot and an
//! immutable rule set, and never fail.

mod health;
mod stage;

pub use health::*;
pub use stage::*;
