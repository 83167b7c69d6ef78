//! HTTP surface for the case workflow. The identity boundary is stubbed as
//! `x-actor-id` / `x-actor-role` headers; everything else is JSON.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{Actor, CaseId, Role, UserId};
use super::evaluation::EvaluationForm;
use super::repository::{ArchiveOutcome, CaseStore, NotificationDispatcher, StoreError};
use super::rubric::FixedCriterion;
use super::service::{CaseServiceError, CommissionCaseService, IntakeForm, NewCaseForm};

/// Router builder exposing the rubric administration and case workflow
/// endpoints.
pub fn case_router<S, N>(service: Arc<CommissionCaseService<S, N>>) -> Router
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    Router::new()
        .route("/api/v1/equivalence/rubric", get(rubric_view::<S, N>))
        .route(
            "/api/v1/equivalence/rubric/fixed/:criterion/max",
            put(set_fixed_max::<S, N>),
        )
        .route(
            "/api/v1/equivalence/rubric/fixed/:criterion",
            delete(remove_fixed_criterion::<S, N>),
        )
        .route(
            "/api/v1/equivalence/rubric/fixed/:criterion/competencies",
            post(add_fixed_competency::<S, N>),
        )
        .route(
            "/api/v1/equivalence/rubric/fixed/:criterion/competencies/:competency_id",
            delete(remove_fixed_competency::<S, N>),
        )
        .route(
            "/api/v1/equivalence/rubric/custom",
            post(add_custom_criterion::<S, N>),
        )
        .route(
            "/api/v1/equivalence/rubric/custom/:id",
            delete(remove_custom_criterion::<S, N>),
        )
        .route(
            "/api/v1/equivalence/rubric/custom/:id/competencies",
            post(add_custom_competency::<S, N>),
        )
        .route(
            "/api/v1/equivalence/rubric/custom/:id/competencies/:competency_id",
            delete(remove_custom_competency::<S, N>),
        )
        .route(
            "/api/v1/equivalence/rubric/internships",
            post(add_internship::<S, N>),
        )
        .route(
            "/api/v1/equivalence/rubric/internships/:id",
            delete(remove_internship::<S, N>),
        )
        .route("/api/v1/equivalence/cases", post(create_case::<S, N>))
        .route("/api/v1/equivalence/cases/:id", get(case_view::<S, N>))
        .route(
            "/api/v1/equivalence/cases/:id/assign",
            post(assign_case::<S, N>),
        )
        .route(
            "/api/v1/equivalence/cases/:id/intake",
            put(record_intake::<S, N>),
        )
        .route(
            "/api/v1/equivalence/cases/:id/scores",
            put(record_scores::<S, N>),
        )
        .route(
            "/api/v1/equivalence/cases/:id/submit",
            post(submit_evaluation::<S, N>),
        )
        .route(
            "/api/v1/equivalence/cases/:id/return",
            post(return_to_administrator::<S, N>),
        )
        .route(
            "/api/v1/equivalence/cases/:id/validate",
            post(validate_case::<S, N>),
        )
        .route(
            "/api/v1/equivalence/cases/:id/reopen",
            post(return_to_reviewer::<S, N>),
        )
        .with_state(service)
}

fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Response> {
    let id = headers
        .get("x-actor-id")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty());
    let role = headers
        .get("x-actor-role")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| match value {
            "administrator" => Some(Role::Administrator),
            "reviewer" => Some(Role::Reviewer),
            _ => None,
        });
    match (id, role) {
        (Some(id), Some(role)) => Ok(Actor {
            id: UserId(id.to_string()),
            role,
        }),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            axum::Json(json!({
                "error": "x-actor-id and x-actor-role (administrator|reviewer) headers are required",
            })),
        )
            .into_response()),
    }
}

fn parse_criterion(raw: &str) -> Result<FixedCriterion, Response> {
    FixedCriterion::from_str(raw).map_err(|err| {
        (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "error": err.to_string() })),
        )
            .into_response()
    })
}

fn error_response(error: CaseServiceError) -> Response {
    let status = match &error {
        CaseServiceError::Validation(_) | CaseServiceError::Rubric(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CaseServiceError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        CaseServiceError::NotFound { .. } | CaseServiceError::Store(StoreError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        CaseServiceError::InvalidTransition { .. }
        | CaseServiceError::EvaluationMissing
        | CaseServiceError::Store(StoreError::Conflict)
        | CaseServiceError::Store(StoreError::StaleRubric) => StatusCode::CONFLICT,
        CaseServiceError::Store(StoreError::Unavailable(_))
        | CaseServiceError::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = match &error {
        CaseServiceError::Validation(violations) => json!({
            "error": "validation failed",
            "violations": violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
        }),
        other => json!({ "error": other.to_string() }),
    };
    (status, axum::Json(payload)).into_response()
}

#[derive(Debug, Deserialize)]
struct MaxForm {
    value: u32,
}

#[derive(Debug, Deserialize)]
struct CustomCriterionForm {
    name: String,
    max_points: u32,
}

#[derive(Debug, Deserialize)]
struct CompetencyForm {
    label: String,
}

#[derive(Debug, Deserialize)]
struct InternshipForm {
    name: String,
    duration: String,
}

#[derive(Debug, Deserialize)]
struct AssignForm {
    reviewers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MessageForm {
    #[serde(default)]
    message: String,
}

async fn rubric_view<S, N>(State(service): State<Arc<CommissionCaseService<S, N>>>) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    match service.active_rubric() {
        Ok(rubric) => (StatusCode::OK, axum::Json(rubric)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn set_fixed_max<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    Path(criterion): Path<String>,
    headers: HeaderMap,
    axum::Json(form): axum::Json<MaxForm>,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let criterion = match parse_criterion(&criterion) {
        Ok(criterion) => criterion,
        Err(response) => return response,
    };
    match service.set_fixed_max(&actor, criterion, form.value) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

async fn remove_fixed_criterion<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    Path(criterion): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let criterion = match parse_criterion(&criterion) {
        Ok(criterion) => criterion,
        Err(response) => return response,
    };
    match service.remove_fixed_criterion(&actor, criterion) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

async fn add_fixed_competency<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    Path(criterion): Path<String>,
    headers: HeaderMap,
    axum::Json(form): axum::Json<CompetencyForm>,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let criterion = match parse_criterion(&criterion) {
        Ok(criterion) => criterion,
        Err(response) => return response,
    };
    match service.add_fixed_competency(&actor, criterion, &form.label) {
        Ok(id) => (StatusCode::CREATED, axum::Json(json!({ "id": id }))).into_response(),
        Err(error) => error_response(error),
    }
}

async fn remove_fixed_competency<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    Path((criterion, competency_id)): Path<(String, u32)>,
    headers: HeaderMap,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let criterion = match parse_criterion(&criterion) {
        Ok(criterion) => criterion,
        Err(response) => return response,
    };
    match service.remove_fixed_competency(&actor, criterion, competency_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

async fn add_custom_criterion<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    headers: HeaderMap,
    axum::Json(form): axum::Json<CustomCriterionForm>,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.add_custom_criterion(&actor, &form.name, form.max_points) {
        Ok(id) => (StatusCode::CREATED, axum::Json(json!({ "id": id }))).into_response(),
        Err(error) => error_response(error),
    }
}

async fn remove_custom_criterion<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    Path(id): Path<u32>,
    headers: HeaderMap,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.remove_custom_criterion(&actor, id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

async fn add_custom_competency<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    Path(id): Path<u32>,
    headers: HeaderMap,
    axum::Json(form): axum::Json<CompetencyForm>,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.add_custom_competency(&actor, id, &form.label) {
        Ok(competency) => {
            (StatusCode::CREATED, axum::Json(json!({ "id": competency }))).into_response()
        }
        Err(error) => error_response(error),
    }
}

async fn remove_custom_competency<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    Path((id, competency_id)): Path<(u32, u32)>,
    headers: HeaderMap,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.remove_custom_competency(&actor, id, competency_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

async fn add_internship<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    headers: HeaderMap,
    axum::Json(form): axum::Json<InternshipForm>,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.add_internship(&actor, &form.name, &form.duration) {
        Ok(id) => (StatusCode::CREATED, axum::Json(json!({ "id": id }))).into_response(),
        Err(error) => error_response(error),
    }
}

async fn remove_internship<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    Path(id): Path<u32>,
    headers: HeaderMap,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.remove_internship(&actor, id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

async fn create_case<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    headers: HeaderMap,
    axum::Json(form): axum::Json<NewCaseForm>,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.register_case(&actor, form) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn case_view<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.case_view(&actor, &CaseId(id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn assign_case<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    axum::Json(form): axum::Json<AssignForm>,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let reviewers = form.reviewers.into_iter().map(UserId).collect();
    match service.assign(&actor, &CaseId(id), reviewers) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn record_intake<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    axum::Json(form): axum::Json<IntakeForm>,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.record_intake(&actor, &CaseId(id), form) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn record_scores<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    axum::Json(form): axum::Json<EvaluationForm>,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.record_scores(&actor, &CaseId(id), &form) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn submit_evaluation<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    axum::Json(form): axum::Json<EvaluationForm>,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.submit_for_validation(&actor, &CaseId(id), &form) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn return_to_administrator<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    axum::Json(form): axum::Json<MessageForm>,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.return_to_administrator(&actor, &CaseId(id), &form.message) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

async fn validate_case<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.validate_and_archive(&actor, &CaseId(id)) {
        Ok(ArchiveOutcome::Archived) => (
            StatusCode::OK,
            axum::Json(json!({ "outcome": "archived" })),
        )
            .into_response(),
        Ok(ArchiveOutcome::AlreadyArchived) => (
            StatusCode::OK,
            axum::Json(json!({
                "outcome": "already_archived",
                "warning": "the case was already in the archive",
            })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

async fn return_to_reviewer<S, N>(
    State(service): State<Arc<CommissionCaseService<S, N>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    axum::Json(form): axum::Json<MessageForm>,
) -> Response
where
    S: CaseStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.return_to_reviewer(&actor, &CaseId(id), &form.message) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}
