//! Report intake, near-duplicate merging, priority/trust scoring, and area
//! health reporting over a process-wide in-memory issue store.

pub mod area;
pub mod classifier;
pub mod domain;
pub mod guide;
pub mod import;
pub mod router;
pub mod rules;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use area::{bucket_key, AreaHealth, CriticalArea, HealthColor};
pub use classifier::{
    authority_for, Classification, IssueClassifier, KeywordClassifier, Lexicon, GENERAL_HELPLINE,
};
pub use domain::{Category, Coordinates, Issue, IssueId, IssueStatus, Level, LocationError};
pub use guide::{ActionGuide, Locale};
pub use import::{ImportError, RecordedReport};
pub use router::{triage_router, ReportRequest};
pub use service::{ReportOutcome, TriageError, TriageService};
pub use store::{IssueStats, IssueStore, ResolveError, ResolvedMatchPolicy, Submission};
