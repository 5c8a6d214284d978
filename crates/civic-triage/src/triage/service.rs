use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::area::{AreaHealth, CriticalArea};
use super::classifier::IssueClassifier;
use super::domain::{Category, Coordinates, Issue, IssueId, Level, LocationError};
use super::guide::ActionGuide;
use super::store::{IssueStats, IssueStore, ResolveError};

/// Location assumed when a reporter omits one.
pub const DEFAULT_LOCATION: &str = "0,0";

/// Response to a filed report, shaped for the citizen-facing client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportOutcome {
    pub duplicate: bool,
    pub id: IssueId,
    pub category: Category,
    pub authority: String,
    pub priority: Level,
    pub trust_level: Level,
    pub supporters: u32,
    pub actions: Vec<&'static str>,
    pub message: &'static str,
}

/// Composes the classifier, issue store, and action guide.
pub struct TriageService<C> {
    classifier: Arc<C>,
    store: Arc<IssueStore>,
    guide: ActionGuide,
}

impl<C> TriageService<C>
where
    C: IssueClassifier + 'static,
{
    pub fn new(classifier: Arc<C>, store: Arc<IssueStore>, guide: ActionGuide) -> Self {
        Self {
            classifier,
            store,
            guide,
        }
    }

    pub fn store(&self) -> &Arc<IssueStore> {
        &self.store
    }

    /// Classifies and files a free-text report at a `"lat,lon"` location.
    pub fn report(
        &self,
        text: &str,
        location: &str,
        now: DateTime<Utc>,
    ) -> Result<ReportOutcome, TriageError> {
        if text.trim().is_empty() {
            return Err(TriageError::EmptyReport);
        }
        let location: Coordinates = location.parse()?;

        let classification = self.classifier.classify(text);
        let submission = self
            .store
            .submit(classification.category, location, text, now);
        let issue = submission.issue;

        let message = if submission.duplicate {
            "Same issue already reported. Trust & priority increased."
        } else {
            "New issue created."
        };

        info!(
            issue_id = %issue.id,
            category = %issue.category,
            duplicate = submission.duplicate,
            "report triaged"
        );

        Ok(ReportOutcome {
            duplicate: submission.duplicate,
            id: issue.id,
            category: issue.category,
            authority: classification.authority,
            priority: issue.priority,
            trust_level: issue.trust_level,
            supporters: issue.supporters,
            actions: self.guide.actions(issue.category).to_vec(),
            message,
        })
    }

    pub fn resolve(&self, id: IssueId) -> Result<Issue, TriageError> {
        Ok(self.store.resolve(id)?)
    }

    pub fn issue(&self, id: IssueId) -> Result<Issue, TriageError> {
        self.store
            .get(id)
            .ok_or(TriageError::Resolve(ResolveError::NotFound(id)))
    }

    pub fn all_issues(&self) -> Vec<Issue> {
        self.store.list_all()
    }

    pub fn high_priority_open(&self) -> Vec<Issue> {
        self.store.list_high_priority_open()
    }

    pub fn stats(&self) -> IssueStats {
        self.store.stats()
    }

    pub fn critical_areas(&self) -> Vec<CriticalArea> {
        self.store.critical_areas()
    }

    /// Escalates aging open issues before reporting; see
    /// [`IssueStore::escalate_and_report_area_health`].
    pub fn area_health(&self, now: DateTime<Utc>) -> Vec<AreaHealth> {
        self.store.escalate_and_report_area_health(now)
    }
}

/// Error raised by the triage service.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("report text must not be empty")]
    EmptyReport,
    #[error(transparent)]
    Location(#[from] LocationError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
