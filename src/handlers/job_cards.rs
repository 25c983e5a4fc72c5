use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{job_card, step_transition},
    errors::ServiceError,
    services::job_cards::{AdvanceStepCommand, CreateJobCardCommand},
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateJobCardRequest {
    pub plan_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub urgent: Option<bool>,
    pub actor_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AdvanceStepRequest {
    pub target_step: i32,
    /// Step the caller last observed; a stale value fails the call instead
    /// of silently re-applying it.
    pub expected_current_step: Option<i32>,
    pub notes: Option<String>,
    pub actor_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct HoldRequest {
    pub reason: Option<String>,
    pub actor_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ActorRequest {
    pub actor_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SetUrgentRequest {
    pub urgent: bool,
    pub actor_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DwellTimeResponse {
    pub job_card_id: Uuid,
    pub step_id: i32,
    /// None while the card has not yet entered the step.
    pub dwell_seconds: Option<i64>,
}

pub fn job_cards_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_job_card))
        .route("/:id", get(get_job_card))
        .route("/:id/advance", post(advance_step))
        .route("/:id/hold", post(hold_job_card))
        .route("/:id/resume", post(resume_job_card))
        .route("/:id/urgent", put(set_urgent))
        .route("/:id/history", get(get_history))
        .route("/:id/dwell/:step_id", get(get_dwell_time))
}

#[utoipa::path(
    post,
    path = "/api/v1/job-cards",
    request_body = CreateJobCardRequest,
    responses(
        (status = 201, description = "Job card created", body = ApiResponse<job_card::Model>),
        (status = 404, description = "Plan not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Plan capacity exceeded", body = crate::errors::ErrorResponse),
    ),
    tag = "job-cards"
)]
pub async fn create_job_card(
    State(state): State<AppState>,
    Json(request): Json<CreateJobCardRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let card = state
        .services
        .job_cards
        .create_job_card(
            CreateJobCardCommand {
                plan_id: request.plan_id,
                quantity: request.quantity,
                urgent: request.urgent,
            },
            request.actor_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(card))))
}

#[utoipa::path(
    get,
    path = "/api/v1/job-cards/{id}",
    params(("id" = Uuid, Path, description = "Job card id")),
    responses(
        (status = 200, description = "Job card retrieved", body = ApiResponse<job_card::Model>),
        (status = 404, description = "Job card not found", body = crate::errors::ErrorResponse),
    ),
    tag = "job-cards"
)]
pub async fn get_job_card(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<job_card::Model>>, ServiceError> {
    let card = state.services.job_cards.get_job_card(id).await?;
    Ok(Json(ApiResponse::success(card)))
}

#[utoipa::path(
    post,
    path = "/api/v1/job-cards/{id}/advance",
    params(("id" = Uuid, Path, description = "Job card id")),
    request_body = AdvanceStepRequest,
    responses(
        (status = 200, description = "Job card advanced", body = ApiResponse<job_card::Model>),
        (status = 400, description = "Invalid transition", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent modification", body = crate::errors::ErrorResponse),
    ),
    tag = "job-cards"
)]
pub async fn advance_step(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AdvanceStepRequest>,
) -> Result<Json<ApiResponse<job_card::Model>>, ServiceError> {
    let card = state
        .services
        .job_cards
        .advance_step(
            AdvanceStepCommand {
                job_card_id: id,
                target_step: request.target_step,
                expected_current_step: request.expected_current_step,
                notes: request.notes,
            },
            request.actor_id,
        )
        .await?;

    Ok(Json(ApiResponse::success(card)))
}

#[utoipa::path(
    post,
    path = "/api/v1/job-cards/{id}/hold",
    params(("id" = Uuid, Path, description = "Job card id")),
    request_body = HoldRequest,
    responses(
        (status = 200, description = "Job card put on hold", body = ApiResponse<job_card::Model>),
        (status = 400, description = "Card not holdable in its current state", body = crate::errors::ErrorResponse),
    ),
    tag = "job-cards"
)]
pub async fn hold_job_card(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<HoldRequest>,
) -> Result<Json<ApiResponse<job_card::Model>>, ServiceError> {
    let card = state
        .services
        .job_cards
        .hold_job_card(id, request.reason, request.actor_id)
        .await?;
    Ok(Json(ApiResponse::success(card)))
}

#[utoipa::path(
    post,
    path = "/api/v1/job-cards/{id}/resume",
    params(("id" = Uuid, Path, description = "Job card id")),
    request_body = ActorRequest,
    responses(
        (status = 200, description = "Job card resumed", body = ApiResponse<job_card::Model>),
        (status = 400, description = "Card is not on hold", body = crate::errors::ErrorResponse),
    ),
    tag = "job-cards"
)]
pub async fn resume_job_card(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<ApiResponse<job_card::Model>>, ServiceError> {
    let card = state
        .services
        .job_cards
        .resume_job_card(id, request.actor_id)
        .await?;
    Ok(Json(ApiResponse::success(card)))
}

#[utoipa::path(
    put,
    path = "/api/v1/job-cards/{id}/urgent",
    params(("id" = Uuid, Path, description = "Job card id")),
    request_body = SetUrgentRequest,
    responses(
        (status = 200, description = "Urgency flag updated", body = ApiResponse<job_card::Model>),
    ),
    tag = "job-cards"
)]
pub async fn set_urgent(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetUrgentRequest>,
) -> Result<Json<ApiResponse<job_card::Model>>, ServiceError> {
    let card = state
        .services
        .job_cards
        .set_urgent(id, request.urgent, request.actor_id)
        .await?;
    Ok(Json(ApiResponse::success(card)))
}

#[utoipa::path(
    get,
    path = "/api/v1/job-cards/{id}/history",
    params(("id" = Uuid, Path, description = "Job card id")),
    responses(
        (status = 200, description = "Step transition log, oldest first", body = ApiResponse<Vec<step_transition::Model>>),
    ),
    tag = "job-cards"
)]
pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<step_transition::Model>>>, ServiceError> {
    let transitions = state.services.job_cards.history(id).await?;
    Ok(Json(ApiResponse::success(transitions)))
}

#[utoipa::path(
    get,
    path = "/api/v1/job-cards/{id}/dwell/{step_id}",
    params(
        ("id" = Uuid, Path, description = "Job card id"),
        ("step_id" = i32, Path, description = "Pipeline step id"),
    ),
    responses(
        (status = 200, description = "Time spent at the step", body = ApiResponse<DwellTimeResponse>),
        (status = 400, description = "Unknown step", body = crate::errors::ErrorResponse),
    ),
    tag = "job-cards"
)]
pub async fn get_dwell_time(
    State(state): State<AppState>,
    Path((id, step_id)): Path<(Uuid, i32)>,
) -> Result<Json<ApiResponse<DwellTimeResponse>>, ServiceError> {
    let dwell = state.services.job_cards.dwell_time(id, step_id).await?;
    Ok(Json(ApiResponse::success(DwellTimeResponse {
        job_card_id: id,
        step_id,
        dwell_seconds: dwell.map(|d| d.num_seconds()),
    })))
}
