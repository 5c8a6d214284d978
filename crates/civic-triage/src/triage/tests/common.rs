use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::triage::classifier::{Classification, IssueClassifier, KeywordClassifier};
use crate::triage::domain::Category;
use crate::triage::guide::{ActionGuide, Locale};
use crate::triage::store::{IssueStore, ResolvedMatchPolicy};
use crate::triage::{triage_router, TriageService};

/// Classifier double that always answers with one category and records
/// every text it was asked about.
#[derive(Default)]
pub(super) struct FixedClassifier {
    category: Option<Category>,
    seen: Mutex<Vec<String>>,
}

impl FixedClassifier {
    pub(super) fn new(category: Category) -> Self {
        Self {
            category: Some(category),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn seen(&self) -> Vec<String> {
        self.seen.lock().expect("classifier mutex poisoned").clone()
    }
}

impl IssueClassifier for FixedClassifier {
    fn classify(&self, text: &str) -> Classification {
        self.seen
            .lock()
            .expect("classifier mutex poisoned")
            .push(text.to_string());
        Classification::for_category(self.category.unwrap_or(Category::Unclassified))
    }
}

pub(super) fn reported_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn keyword_service(
    policy: ResolvedMatchPolicy,
    locale: Locale,
) -> (TriageService<KeywordClassifier>, Arc<IssueStore>) {
    let store = Arc::new(IssueStore::new(policy));
    let service = TriageService::new(
        Arc::new(KeywordClassifier::default()),
        store.clone(),
        ActionGuide::new(locale),
    );
    (service, store)
}

pub(super) fn fixed_service(
    category: Category,
) -> (TriageService<FixedClassifier>, Arc<FixedClassifier>) {
    let classifier = Arc::new(FixedClassifier::new(category));
    let service = TriageService::new(
        classifier.clone(),
        Arc::new(IssueStore::default()),
        ActionGuide::default(),
    );
    (service, classifier)
}

pub(super) fn router_with_service(service: TriageService<KeywordClassifier>) -> axum::Router {
    triage_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
