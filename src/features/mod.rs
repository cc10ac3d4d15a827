//! Feature extraction
//!
//! Converts raw game records into rest-aware, bias-adjusted training rows.

pub mod rest;

pub use rest::{FeatureEngineer, GameFeatures, RestState, TeamTimeline, RESTED_DAYS};
