use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::warn;

use super::domain::{CompanyId, SubmissionDraft, SubmissionId};
use super::repository::{DealflowRepository, RepositoryError, StatusPublisher};
use super::service::{EvaluateOutcome, EvaluationOrchestrator, OrchestratorError};

/// Router builder exposing HTTP endpoints for intake, evaluation triggers,
/// and the polling read surface.
pub fn evaluation_router<R, P>(service: Arc<EvaluationOrchestrator<R, P>>) -> Router
where
    R: DealflowRepository + 'static,
    P: StatusPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/submissions",
            post(submit_handler::<R, P>).get(list_handler::<R, P>),
        )
        .route(
            "/api/v1/submissions/:submission_id",
            get(snapshot_handler::<R, P>),
        )
        .route(
            "/api/v1/submissions/:submission_id/evaluate",
            post(evaluate_handler::<R, P>),
        )
        .route(
            "/api/v1/submissions/:submission_id/evaluations",
            get(history_handler::<R, P>),
        )
        .route("/api/v1/companies", get(companies_handler::<R, P>))
        .route("/api/v1/companies/:company_id", get(company_handler::<R, P>))
        .with_state(service)
}

pub(crate) async fn submit_handler<R, P>(
    State(service): State<Arc<EvaluationOrchestrator<R, P>>>,
    axum::Json(draft): axum::Json<SubmissionDraft>,
) -> Response
where
    R: DealflowRepository + 'static,
    P: StatusPublisher + 'static,
{
    let auto_analyze = draft.auto_analyze;
    match service.submit(draft) {
        Ok(record) => {
            if auto_analyze {
                // Fire-and-forget: scheduling the orchestrator must not
                // block or fail the intake response.
                let service = service.clone();
                let id = record.submission_id.clone();
                tokio::spawn(async move {
                    if let Err(err) = service.evaluate(&id).await {
                        warn!(submission = %id.0, error = %err, "auto analysis failed");
                    }
                });
            }
            (StatusCode::CREATED, axum::Json(record.status_view())).into_response()
        }
        Err(OrchestratorError::Intake(error)) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(OrchestratorError::Repository(RepositoryError::Conflict)) => {
            let payload = json!({ "error": "submission already exists" });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn evaluate_handler<R, P>(
    State(service): State<Arc<EvaluationOrchestrator<R, P>>>,
    Path(submission_id): Path<String>,
) -> Response
where
    R: DealflowRepository + 'static,
    P: StatusPublisher + 'static,
{
    let id = SubmissionId(submission_id);
    match service.evaluate(&id).await {
        Ok(EvaluateOutcome::Completed(evaluation)) => {
            let payload = json!({
                "success": true,
                "evaluation_id": evaluation.evaluation_id,
                "model": evaluation.model,
                "evaluation": evaluation.scorecard,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        // Duplicate trigger: informational, the model was not invoked.
        Ok(EvaluateOutcome::Busy(status)) => {
            let payload = json!({
                "success": false,
                "status": status.label(),
                "message": format!("analysis already {}", status.label()),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(OrchestratorError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({ "error": "submission not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn snapshot_handler<R, P>(
    State(service): State<Arc<EvaluationOrchestrator<R, P>>>,
    Path(submission_id): Path<String>,
) -> Response
where
    R: DealflowRepository + 'static,
    P: StatusPublisher + 'static,
{
    let id = SubmissionId(submission_id);
    match service.get(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(err) => not_found_or_internal(err, "submission not found"),
    }
}

pub(crate) async fn list_handler<R, P>(
    State(service): State<Arc<EvaluationOrchestrator<R, P>>>,
) -> Response
where
    R: DealflowRepository + 'static,
    P: StatusPublisher + 'static,
{
    match service.list() {
        Ok(records) => {
            let views: Vec<_> = records.iter().map(|record| record.status_view()).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(err) => internal(err),
    }
}

pub(crate) async fn history_handler<R, P>(
    State(service): State<Arc<EvaluationOrchestrator<R, P>>>,
    Path(submission_id): Path<String>,
) -> Response
where
    R: DealflowRepository + 'static,
    P: StatusPublisher + 'static,
{
    let id = SubmissionId(submission_id);
    match service.history(&id) {
        Ok(evaluations) => (StatusCode::OK, axum::Json(evaluations)).into_response(),
        Err(err) => not_found_or_internal(err, "submission not found"),
    }
}

pub(crate) async fn company_handler<R, P>(
    State(service): State<Arc<EvaluationOrchestrator<R, P>>>,
    Path(company_id): Path<String>,
) -> Response
where
    R: DealflowRepository + 'static,
    P: StatusPublisher + 'static,
{
    let id = CompanyId(company_id);
    match service.company(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => not_found_or_internal(err, "company not found"),
    }
}

pub(crate) async fn companies_handler<R, P>(
    State(service): State<Arc<EvaluationOrchestrator<R, P>>>,
) -> Response
where
    R: DealflowRepository + 'static,
    P: StatusPublisher + 'static,
{
    match service.companies() {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(err) => internal(err),
    }
}

fn not_found_or_internal(err: OrchestratorError, message: &str) -> Response {
    match err {
        OrchestratorError::Repository(RepositoryError::NotFound) => {
            let payload = json!({ "error": message });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        other => internal(other),
    }
}

fn internal(err: OrchestratorError) -> Response {
    let payload = json!({ "error": err.to_string() });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
