use chrono::{DateTime, NaiveDate, Utc};
use civic_triage::config::TriageConfig;
use civic_triage::error::AppError;
use civic_triage::triage::import::lexicon_from_path;
use civic_triage::triage::{ActionGuide, IssueStore, KeywordClassifier, TriageService};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type AppService = TriageService<KeywordClassifier>;

/// Builds the process-wide triage service from configuration, loading a CSV
/// lexicon when one is configured.
pub(crate) fn build_service(config: &TriageConfig) -> Result<Arc<AppService>, AppError> {
    let classifier = match &config.classifier_lexicon {
        Some(path) => {
            let lexicon = lexicon_from_path(path)?;
            info!(path = %path.display(), cues = lexicon.len(), "loaded classifier lexicon");
            KeywordClassifier::new(lexicon)
        }
        None => KeywordClassifier::default(),
    };

    let store = Arc::new(IssueStore::new(config.resolved_match));
    Ok(Arc::new(TriageService::new(
        Arc::new(classifier),
        store,
        ActionGuide::new(config.locale),
    )))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// End of the given day, so "as of" dates count that whole day.
pub(crate) fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(23, 59, 59)
        .map(|naive| naive.and_utc())
        .unwrap_or_else(Utc::now)
}
