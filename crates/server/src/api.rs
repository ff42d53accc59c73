//! Workflow routes for part-code modification requests.
//!
//! - `GET  /ping`                              - liveness
//! - `POST /create-requests`                   - creator submits a request
//! - `GET  /created-requests`                  - creator history
//! - `GET  /requests/{id}`                     - single request detail
//! - `PUT  /requests/{id}`                     - correction resubmit
//! - `GET  /approve-requests`                  - approver queue
//! - `POST /approve-requests/{id}/action`      - approver approve/reject/return
//! - `GET  /approved-requests`                 - approver history
//! - `GET  /validation-requests`               - validator queue
//! - `POST /validation-requests/{id}/action`   - validator approve/reject/return
//! - `GET  /validated-requests`                - validator history
//!
//! Every list endpoint takes the placeholder `function` category filter.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use partflow_core::domain::request::{ModificationRequest, RequestId, RequestPayload};
use partflow_core::workflow::engine::{WorkflowAction, WorkflowEngine, WorkflowError};
use partflow_core::workflow::views::{RoleView, KNOWN_CATEGORY};
use partflow_db::repositories::{RepositoryError, RequestRepository, SqlRequestRepository};
use partflow_db::DbPool;

use crate::identity::{IdentityResolver, Role};

#[derive(Clone)]
pub struct ApiState {
    repo: SqlRequestRepository,
    identity: IdentityResolver,
    engine: WorkflowEngine,
}

pub fn router(db_pool: DbPool, identity: IdentityResolver) -> Router {
    let state = ApiState {
        repo: SqlRequestRepository::new(db_pool),
        identity,
        engine: WorkflowEngine,
    };

    Router::new()
        .route("/ping", get(ping))
        .route("/create-requests", post(create_request))
        .route("/created-requests", get(created_requests))
        .route("/requests/{id}", get(request_detail))
        .route("/requests/{id}", put(resubmit_request))
        .route("/approve-requests", get(approve_queue))
        .route("/approve-requests/{id}/action", post(approver_action))
        .route("/approved-requests", get(approver_history))
        .route("/validation-requests", get(validation_queue))
        .route("/validation-requests/{id}/action", post(validator_action))
        .route("/validated-requests", get(validator_history))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Creation payload and correction patch, in the camelCase key set the
/// original clients send. Absent fields keep their previous value on
/// resubmission.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    pub plant: Option<String>,
    pub sap_part_code: Option<String>,
    pub new_description: Option<String>,
    pub hsn_code: Option<String>,
    pub from_to_state: Option<String>,
    pub tax_percent: Option<String>,
    pub sales_views: Option<String>,
    pub supplying_plant: Option<String>,
    pub receiving_plant: Option<String>,
    pub tax_indication: Option<String>,
    pub procurement_type: Option<String>,
    pub storage_location: Option<String>,
    pub production_version: Option<String>,
    pub quality_management: Option<String>,
    pub remarks: Option<String>,
}

impl RequestBody {
    fn into_payload(self) -> RequestPayload {
        RequestPayload {
            plant: self.plant,
            part_code: self.sap_part_code,
            description: self.new_description,
            hsn_code: self.hsn_code,
            from_state_to_state: self.from_to_state,
            tax: self.tax_percent,
            sales_views: self.sales_views,
            supplying_plant: self.supplying_plant,
            receiving_plant: self.receiving_plant,
            tax_indication: self.tax_indication,
            procurement_type: self.procurement_type,
            storage_location: self.storage_location,
            production_version: self.production_version,
            quality_management: self.quality_management,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActionBody {
    pub action: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    pub function: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub id: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

/// One row of a queue or history listing. The original emitted five
/// slightly drifting field sets; this is the consolidated superset.
#[derive(Debug, Serialize)]
pub struct RequestRow {
    pub id: String,
    pub function: &'static str,
    pub plant: Option<String>,
    pub part_code: Option<String>,
    pub description: Option<String>,
    pub owner: Option<String>,
    pub status: &'static str,
    pub approver: Option<String>,
    pub validation_status: Option<&'static str>,
    pub validated_by: Option<String>,
    pub reason_for_return: Option<String>,
    pub created: String,
    pub submission_date: String,
    pub modified_date: String,
}

impl From<ModificationRequest> for RequestRow {
    fn from(request: ModificationRequest) -> Self {
        Self {
            id: request.id.0,
            function: KNOWN_CATEGORY,
            plant: request.payload.plant,
            part_code: request.payload.part_code,
            description: request.payload.description,
            owner: request.created_by,
            status: request.status.as_str(),
            approver: request.approved_by,
            validation_status: request.validation_status.map(|v| v.as_str()),
            validated_by: request.validated_by,
            reason_for_return: request.remarks,
            created: request.created_at.to_rfc3339(),
            submission_date: request.submitted_at.to_rfc3339(),
            modified_date: request.last_modified_at.to_rfc3339(),
        }
    }
}

/// Full single-request view used by the detail/correction page.
#[derive(Debug, Serialize)]
pub struct RequestDetail {
    pub id: String,
    #[serde(flatten)]
    pub payload: RequestPayload,
    pub status: &'static str,
    pub validation_status: Option<&'static str>,
    pub remarks: Option<String>,
    pub validator_remarks: Option<String>,
    pub last_returned_by_role: Option<&'static str>,
    pub created_by: Option<String>,
    pub approved_by: Option<String>,
    pub rejected_by: Option<String>,
    pub validated_by: Option<String>,
    pub created_at: String,
    pub submitted_at: String,
    pub last_modified_at: String,
    pub approved_at: Option<String>,
    pub rejected_at: Option<String>,
    pub validated_at: Option<String>,
}

fn rfc3339(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|t| t.to_rfc3339())
}

impl From<ModificationRequest> for RequestDetail {
    fn from(request: ModificationRequest) -> Self {
        Self {
            id: request.id.0,
            payload: request.payload,
            status: request.status.as_str(),
            validation_status: request.validation_status.map(|v| v.as_str()),
            remarks: request.remarks,
            validator_remarks: request.validator_remarks,
            last_returned_by_role: request.last_returned_by_role.map(|r| r.as_str()),
            created_by: request.created_by,
            approved_by: request.approved_by,
            rejected_by: request.rejected_by,
            validated_by: request.validated_by,
            created_at: request.created_at.to_rfc3339(),
            submitted_at: request.submitted_at.to_rfc3339(),
            last_modified_at: request.last_modified_at.to_rfc3339(),
            approved_at: rfc3339(request.approved_at),
            rejected_at: rfc3339(request.rejected_at),
            validated_at: rfc3339(request.validated_at),
        }
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

type ApiFailure = (StatusCode, Json<ApiError>);

fn workflow_error(error: WorkflowError) -> ApiFailure {
    let status = match &error {
        WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
        WorkflowError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
        WorkflowError::MissingRequiredField { .. } | WorkflowError::UnknownAction { .. } => {
            StatusCode::BAD_REQUEST
        }
    };
    (status, Json(ApiError { error: error.to_string() }))
}

fn db_error(error: RepositoryError) -> ApiFailure {
    warn!(event_name = "api.store_error", error = %error, "repository operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError { error: "storage operation failed".to_string() }),
    )
}

fn not_found(id: &str) -> ApiFailure {
    workflow_error(WorkflowError::NotFound { id: id.to_string() })
}

fn conflict(id: &str) -> ApiFailure {
    (
        StatusCode::CONFLICT,
        Json(ApiError { error: format!("request `{id}` was modified concurrently") }),
    )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_request(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<RequestBody>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiFailure> {
    let actor = state.identity.resolve(&headers, Role::Creator);
    let remarks = body.remarks.clone();
    let request = state.engine.create(body.into_payload(), remarks, &actor, Utc::now());

    state.repo.insert(request.clone()).await.map_err(db_error)?;

    info!(
        event_name = "workflow.request.created",
        request_id = %request.id,
        actor = %actor,
        "modification request created"
    );

    Ok((
        StatusCode::CREATED,
        Json(StatusResponse { id: request.id.0, status: request.status.as_str() }),
    ))
}

async fn request_detail(
    Path(id): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<RequestDetail>, ApiFailure> {
    let request = state
        .repo
        .find_by_id(&RequestId(id.clone()))
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found(&id))?;

    Ok(Json(RequestDetail::from(request)))
}

async fn resubmit_request(
    Path(id): Path<String>,
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<RequestBody>,
) -> Result<Json<StatusResponse>, ApiFailure> {
    let actor = state.identity.resolve(&headers, Role::Creator);
    let request = state
        .repo
        .find_by_id(&RequestId(id.clone()))
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found(&id))?;

    let previous_status = request.status;
    let resubmitted = state
        .engine
        .resubmit(&request, &body.into_payload(), Utc::now())
        .map_err(workflow_error)?;

    let applied = state
        .repo
        .update_guarded(resubmitted.clone(), previous_status)
        .await
        .map_err(db_error)?;
    if !applied {
        return Err(conflict(&id));
    }

    info!(
        event_name = "workflow.request.resubmitted",
        request_id = %resubmitted.id,
        actor = %actor,
        "corrected request resubmitted for approval"
    );

    Ok(Json(StatusResponse { id: resubmitted.id.0, status: resubmitted.status.as_str() }))
}

async fn approver_action(
    Path(id): Path<String>,
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<ActionBody>,
) -> Result<Json<StatusResponse>, ApiFailure> {
    let actor = state.identity.resolve(&headers, Role::Approver);
    let action = WorkflowAction::parse(&body.action).map_err(workflow_error)?;

    let request = state
        .repo
        .find_by_id(&RequestId(id.clone()))
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found(&id))?;

    let previous_status = request.status;
    let next = state
        .engine
        .approver_act(&request, action, body.remarks.as_deref(), &actor, Utc::now())
        .map_err(workflow_error)?;

    let applied =
        state.repo.update_guarded(next.clone(), previous_status).await.map_err(db_error)?;
    if !applied {
        return Err(conflict(&id));
    }

    info!(
        event_name = "workflow.request.approver_action",
        request_id = %next.id,
        actor = %actor,
        action = action.as_str(),
        status = next.status.as_str(),
        "approver action applied"
    );

    Ok(Json(StatusResponse { id: next.id.0, status: next.status.as_str() }))
}

async fn validator_action(
    Path(id): Path<String>,
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<ActionBody>,
) -> Result<Json<StatusResponse>, ApiFailure> {
    let actor = state.identity.resolve(&headers, Role::Validator);
    let action = WorkflowAction::parse(&body.action).map_err(workflow_error)?;

    let request = state
        .repo
        .find_by_id(&RequestId(id.clone()))
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found(&id))?;

    let previous_status = request.status;
    let next = state
        .engine
        .validator_act(&request, action, body.remarks.as_deref(), &actor, Utc::now())
        .map_err(workflow_error)?;

    let applied =
        state.repo.update_guarded(next.clone(), previous_status).await.map_err(db_error)?;
    if !applied {
        return Err(conflict(&id));
    }

    info!(
        event_name = "workflow.request.validator_action",
        request_id = %next.id,
        actor = %actor,
        action = action.as_str(),
        status = next.status.as_str(),
        "validator action applied"
    );

    Ok(Json(StatusResponse { id: next.id.0, status: next.status.as_str() }))
}

async fn list_view(
    state: &ApiState,
    view: RoleView,
    category: Option<&str>,
) -> Result<Json<Vec<RequestRow>>, ApiFailure> {
    let requests = state.repo.list(view, category).await.map_err(db_error)?;
    Ok(Json(requests.into_iter().map(RequestRow::from).collect()))
}

async fn created_requests(
    Query(query): Query<CategoryQuery>,
    State(state): State<ApiState>,
) -> Result<Json<Vec<RequestRow>>, ApiFailure> {
    list_view(&state, RoleView::CreatorHistory, query.function.as_deref()).await
}

async fn approve_queue(
    Query(query): Query<CategoryQuery>,
    State(state): State<ApiState>,
) -> Result<Json<Vec<RequestRow>>, ApiFailure> {
    list_view(&state, RoleView::ApproverQueue, query.function.as_deref()).await
}

async fn approver_history(
    Query(query): Query<CategoryQuery>,
    State(state): State<ApiState>,
) -> Result<Json<Vec<RequestRow>>, ApiFailure> {
    list_view(&state, RoleView::ApproverHistory, query.function.as_deref()).await
}

async fn validation_queue(
    Query(query): Query<CategoryQuery>,
    State(state): State<ApiState>,
) -> Result<Json<Vec<RequestRow>>, ApiFailure> {
    list_view(&state, RoleView::ValidatorQueue, query.function.as_deref()).await
}

async fn validator_history(
    Query(query): Query<CategoryQuery>,
    State(state): State<ApiState>,
) -> Result<Json<Vec<RequestRow>>, ApiFailure> {
    list_view(&state, RoleView::ValidatorHistory, query.function.as_deref()).await
}
