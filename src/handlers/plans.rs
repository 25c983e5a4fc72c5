use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{job_card, material_request, production_plan, rejection},
    errors::ServiceError,
    services::aggregation::PlanProgress,
    services::plans::CreatePlanCommand,
    ApiResponse, AppState, ListQuery, PaginatedResponse,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreatePlanRequest {
    pub source_spec_id: Uuid,
    pub target_spec_id: Uuid,
    #[validate(range(min = 1))]
    pub total_quantity: i32,
    #[serde(default)]
    pub urgent: bool,
    pub notes: Option<String>,
    pub actor_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdatePlanRequest {
    pub urgent: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectionListQuery {
    #[serde(default)]
    pub only_unresolved: bool,
}

pub fn plans_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_plans).post(create_plan))
        .route("/urgent", get(list_urgent_plans))
        .route("/:id", get(get_plan).put(update_plan))
        .route("/:id/progress", get(get_plan_progress))
        .route("/:id/job-cards", get(list_plan_job_cards))
        .route("/:id/rejections", get(list_plan_rejections))
        .route("/:id/material-requests", get(list_plan_material_requests))
}

#[utoipa::path(
    post,
    path = "/api/v1/plans",
    request_body = CreatePlanRequest,
    responses(
        (status = 201, description = "Plan created", body = ApiResponse<production_plan::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
    ),
    tag = "plans"
)]
pub async fn create_plan(
    State(state): State<AppState>,
    Json(request): Json<CreatePlanRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let plan = state
        .services
        .plans
        .create_plan(
            CreatePlanCommand {
                source_spec_id: request.source_spec_id,
                target_spec_id: request.target_spec_id,
                total_quantity: request.total_quantity,
                urgent: request.urgent,
                notes: request.notes,
            },
            request.actor_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(plan))))
}

#[utoipa::path(
    get,
    path = "/api/v1/plans",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
    ),
    responses(
        (status = 200, description = "Plans retrieved", body = ApiResponse<PaginatedResponse<production_plan::Model>>),
    ),
    tag = "plans"
)]
pub async fn list_plans(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<production_plan::Model>>>, ServiceError> {
    let (plans, total) = state.services.plans.list_plans(query.page, query.limit).await?;
    let total_pages = total.div_ceil(query.limit.max(1));

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: plans,
        total,
        page: query.page,
        limit: query.limit,
        total_pages,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/plans/urgent",
    responses(
        (status = 200, description = "Urgent plans", body = ApiResponse<Vec<production_plan::Model>>),
    ),
    tag = "plans"
)]
pub async fn list_urgent_plans(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<production_plan::Model>>>, ServiceError> {
    let plans = state.services.plans.list_urgent_plans().await?;
    Ok(Json(ApiResponse::success(plans)))
}

#[utoipa::path(
    get,
    path = "/api/v1/plans/{id}",
    params(("id" = Uuid, Path, description = "Plan id")),
    responses(
        (status = 200, description = "Plan retrieved", body = ApiResponse<production_plan::Model>),
        (status = 404, description = "Plan not found", body = crate::errors::ErrorResponse),
    ),
    tag = "plans"
)]
pub async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<production_plan::Model>>, ServiceError> {
    let plan = state.services.plans.get_plan(id).await?;
    Ok(Json(ApiResponse::success(plan)))
}

#[utoipa::path(
    put,
    path = "/api/v1/plans/{id}",
    params(("id" = Uuid, Path, description = "Plan id")),
    request_body = UpdatePlanRequest,
    responses(
        (status = 200, description = "Plan updated", body = ApiResponse<production_plan::Model>),
        (status = 404, description = "Plan not found", body = crate::errors::ErrorResponse),
    ),
    tag = "plans"
)]
pub async fn update_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePlanRequest>,
) -> Result<Json<ApiResponse<production_plan::Model>>, ServiceError> {
    let plan = state
        .services
        .plans
        .update_plan(id, request.urgent, request.notes.map(Some))
        .await?;
    Ok(Json(ApiResponse::success(plan)))
}

#[utoipa::path(
    get,
    path = "/api/v1/plans/{id}/progress",
    params(("id" = Uuid, Path, description = "Plan id")),
    responses(
        (status = 200, description = "Derived plan progress", body = ApiResponse<PlanProgress>),
        (status = 404, description = "Plan not found", body = crate::errors::ErrorResponse),
    ),
    tag = "plans"
)]
pub async fn get_plan_progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PlanProgress>>, ServiceError> {
    let progress = state.services.aggregation.plan_progress(id).await?;
    Ok(Json(ApiResponse::success(progress)))
}

#[utoipa::path(
    get,
    path = "/api/v1/plans/{id}/job-cards",
    params(("id" = Uuid, Path, description = "Plan id")),
    responses(
        (status = 200, description = "Job cards for the plan", body = ApiResponse<Vec<job_card::Model>>),
    ),
    tag = "plans"
)]
pub async fn list_plan_job_cards(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<job_card::Model>>>, ServiceError> {
    let cards = state.services.job_cards.list_job_cards_for_plan(id).await?;
    Ok(Json(ApiResponse::success(cards)))
}

#[utoipa::path(
    get,
    path = "/api/v1/plans/{id}/rejections",
    params(
        ("id" = Uuid, Path, description = "Plan id"),
        ("only_unresolved" = Option<bool>, Query, description = "Restrict to open rejections"),
    ),
    responses(
        (status = 200, description = "Rejections for the plan", body = ApiResponse<Vec<rejection::Model>>),
    ),
    tag = "plans"
)]
pub async fn list_plan_rejections(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<RejectionListQuery>,
) -> Result<Json<ApiResponse<Vec<rejection::Model>>>, ServiceError> {
    let rejections = state
        .services
        .rejections
        .list_rejections_for_plan(id, query.only_unresolved)
        .await?;
    Ok(Json(ApiResponse::success(rejections)))
}

#[utoipa::path(
    get,
    path = "/api/v1/plans/{id}/material-requests",
    params(("id" = Uuid, Path, description = "Plan id")),
    responses(
        (status = 200, description = "Material ledger entries for the plan", body = ApiResponse<Vec<material_request::Model>>),
    ),
    tag = "plans"
)]
pub async fn list_plan_material_requests(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<material_request::Model>>>, ServiceError> {
    let requests = state.services.materials.list_requests_for_plan(id).await?;
    Ok(Json(ApiResponse::success(requests)))
}
