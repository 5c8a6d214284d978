//! Civic issue triage: report classification, near-duplicate merging,
//! priority/trust scoring, and per-area health reporting.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod triage;
