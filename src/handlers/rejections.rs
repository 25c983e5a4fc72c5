use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::rejection::{self, ResolutionAction},
    errors::ServiceError,
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ResolveRejectionRequest {
    pub action: ResolutionAction,
    pub notes: Option<String>,
    pub actor_id: Uuid,
}

pub fn rejections_router() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_rejection))
        .route("/:id/resolve", post(resolve_rejection))
}

#[utoipa::path(
    get,
    path = "/api/v1/rejections/{id}",
    params(("id" = Uuid, Path, description = "Rejection id")),
    responses(
        (status = 200, description = "Rejection retrieved", body = ApiResponse<rejection::Model>),
        (status = 404, description = "Rejection not found", body = crate::errors::ErrorResponse),
    ),
    tag = "rejections"
)]
pub async fn get_rejection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<rejection::Model>>, ServiceError> {
    let rejection = state.services.rejections.get_rejection(id).await?;
    Ok(Json(ApiResponse::success(rejection)))
}

#[utoipa::path(
    post,
    path = "/api/v1/rejections/{id}/resolve",
    params(("id" = Uuid, Path, description = "Rejection id")),
    request_body = ResolveRejectionRequest,
    responses(
        (status = 200, description = "Rejection resolved", body = ApiResponse<rejection::Model>),
        (status = 409, description = "Already resolved", body = crate::errors::ErrorResponse),
        (status = 422, description = "Rework would exceed plan capacity", body = crate::errors::ErrorResponse),
    ),
    tag = "rejections"
)]
pub async fn resolve_rejection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ResolveRejectionRequest>,
) -> Result<Json<ApiResponse<rejection::Model>>, ServiceError> {
    let resolved = state
        .services
        .rejections
        .resolve(id, request.action, request.notes, request.actor_id)
        .await?;
    Ok(Json(ApiResponse::success(resolved)))
}
