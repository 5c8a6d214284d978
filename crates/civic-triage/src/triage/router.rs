use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppError;

use super::area::{AreaHealth, CriticalArea};
use super::classifier::IssueClassifier;
use super::domain::{Issue, IssueId};
use super::service::{ReportOutcome, TriageService, DEFAULT_LOCATION};
use super::store::IssueStats;

/// Body accepted by the report endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub text: String,
    /// `"lat,lon"`; defaults to `0,0` when absent.
    #[serde(default)]
    pub location: Option<String>,
}

/// Router exposing citizen reporting and admin views.
pub fn triage_router<C>(service: Arc<TriageService<C>>) -> Router
where
    C: IssueClassifier + 'static,
{
    Router::new()
        .route("/", get(home_handler))
        .route("/predict", post(report_handler::<C>))
        .route("/admin/issues", get(all_issues_handler::<C>))
        .route("/admin/issues/high", get(high_priority_handler::<C>))
        .route("/admin/resolve/:issue_id", post(resolve_handler::<C>))
        .route("/admin/stats", get(stats_handler::<C>))
        .route("/admin/areas/critical", get(critical_areas_handler::<C>))
        .route("/area-health", get(area_health_handler::<C>))
        .with_state(service)
}

pub(crate) async fn home_handler() -> &'static str {
    "Civic triage backend running"
}

pub(crate) async fn report_handler<C>(
    State(service): State<Arc<TriageService<C>>>,
    Json(request): Json<ReportRequest>,
) -> Result<Json<ReportOutcome>, AppError>
where
    C: IssueClassifier + 'static,
{
    let location = request.location.as_deref().unwrap_or(DEFAULT_LOCATION);
    let outcome = service.report(&request.text, location, Utc::now())?;
    Ok(Json(outcome))
}

pub(crate) async fn all_issues_handler<C>(
    State(service): State<Arc<TriageService<C>>>,
) -> Json<Vec<Issue>>
where
    C: IssueClassifier + 'static,
{
    Json(service.all_issues())
}

pub(crate) async fn high_priority_handler<C>(
    State(service): State<Arc<TriageService<C>>>,
) -> Json<Vec<Issue>>
where
    C: IssueClassifier + 'static,
{
    Json(service.high_priority_open())
}

pub(crate) async fn resolve_handler<C>(
    State(service): State<Arc<TriageService<C>>>,
    Path(issue_id): Path<u64>,
) -> Result<Json<Value>, AppError>
where
    C: IssueClassifier + 'static,
{
    service.resolve(IssueId(issue_id))?;
    Ok(Json(json!({ "message": "Issue resolved by admin" })))
}

pub(crate) async fn stats_handler<C>(
    State(service): State<Arc<TriageService<C>>>,
) -> Json<IssueStats>
where
    C: IssueClassifier + 'static,
{
    Json(service.stats())
}

pub(crate) async fn critical_areas_handler<C>(
    State(service): State<Arc<TriageService<C>>>,
) -> Json<Vec<CriticalArea>>
where
    C: IssueClassifier + 'static,
{
    Json(service.critical_areas())
}

/// Escalates aging open issues as part of the read.
pub(crate) async fn area_health_handler<C>(
    State(service): State<Arc<TriageService<C>>>,
) -> Json<Vec<AreaHealth>>
where
    C: IssueClassifier + 'static,
{
    Json(service.area_health(Utc::now()))
}
