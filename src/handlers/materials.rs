use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{entities::material_request, errors::ServiceError, ApiResponse, AppState};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateMaterialRequest {
    pub plan_id: Uuid,
    #[validate(range(min = 1))]
    pub requested_quantity: i32,
    pub job_card_id: Option<Uuid>,
    pub actor_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RecordFulfillmentRequest {
    /// Quantity delivered now, added to the running total.
    #[validate(range(min = 1))]
    pub sent_quantity: i32,
}

pub fn materials_router() -> Router<AppState> {
    Router::new()
        .route("/requests", post(create_request))
        .route("/requests/:id", get(get_request))
        .route("/requests/:id/fulfill", post(record_fulfillment))
}

#[utoipa::path(
    post,
    path = "/api/v1/materials/requests",
    request_body = CreateMaterialRequest,
    responses(
        (status = 201, description = "Material request raised", body = ApiResponse<material_request::Model>),
        (status = 404, description = "Plan not found", body = crate::errors::ErrorResponse),
    ),
    tag = "materials"
)]
pub async fn create_request(
    State(state): State<AppState>,
    Json(request): Json<CreateMaterialRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let created = state
        .services
        .materials
        .request_material(
            request.plan_id,
            request.requested_quantity,
            request.job_card_id,
            request.actor_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/materials/requests/{id}",
    params(("id" = Uuid, Path, description = "Material request id")),
    responses(
        (status = 200, description = "Material request retrieved", body = ApiResponse<material_request::Model>),
        (status = 404, description = "Material request not found", body = crate::errors::ErrorResponse),
    ),
    tag = "materials"
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<material_request::Model>>, ServiceError> {
    let request = state.services.materials.get_request(id).await?;
    Ok(Json(ApiResponse::success(request)))
}

#[utoipa::path(
    post,
    path = "/api/v1/materials/requests/{id}/fulfill",
    params(("id" = Uuid, Path, description = "Material request id")),
    request_body = RecordFulfillmentRequest,
    responses(
        (status = 200, description = "Delivery recorded", body = ApiResponse<material_request::Model>),
        (status = 422, description = "Delivery would exceed the requested quantity", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent delivery recorded first", body = crate::errors::ErrorResponse),
    ),
    tag = "materials"
)]
pub async fn record_fulfillment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordFulfillmentRequest>,
) -> Result<Json<ApiResponse<material_request::Model>>, ServiceError> {
    request.validate()?;

    let updated = state
        .services
        .materials
        .record_fulfillment(id, request.sent_quantity)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}
