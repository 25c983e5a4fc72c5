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

use crate::{
    entities::qa_report,
    errors::ServiceError,
    services::qa::SubmitInspectionCommand,
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SubmitInspectionRequest {
    pub job_card_id: Uuid,
    #[validate(range(min = 0))]
    pub accepted_quantity: i32,
    #[validate(range(min = 0))]
    pub rejected_quantity: i32,
    #[validate(range(min = 0, max = 100))]
    pub quality_score: i32,
    /// Required whenever rejected_quantity is positive.
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub actor_id: Uuid,
}

pub fn qa_router() -> Router<AppState> {
    Router::new()
        .route("/inspections", post(submit_inspection))
        .route("/reports/:job_card_id", get(get_report))
}

#[utoipa::path(
    post,
    path = "/api/v1/qa/inspections",
    request_body = SubmitInspectionRequest,
    responses(
        (status = 201, description = "Inspection recorded", body = ApiResponse<qa_report::Model>),
        (status = 400, description = "Invalid inspection", body = crate::errors::ErrorResponse),
        (status = 409, description = "Card already inspected", body = crate::errors::ErrorResponse),
    ),
    tag = "qa"
)]
pub async fn submit_inspection(
    State(state): State<AppState>,
    Json(request): Json<SubmitInspectionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let report = state
        .services
        .qa
        .submit_inspection(
            SubmitInspectionCommand {
                job_card_id: request.job_card_id,
                accepted_quantity: request.accepted_quantity,
                rejected_quantity: request.rejected_quantity,
                quality_score: request.quality_score,
                reason: request.reason,
                notes: request.notes,
            },
            request.actor_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(report))))
}

#[utoipa::path(
    get,
    path = "/api/v1/qa/reports/{job_card_id}",
    params(("job_card_id" = Uuid, Path, description = "Job card id")),
    responses(
        (status = 200, description = "Inspection report for the card", body = ApiResponse<qa_report::Model>),
        (status = 404, description = "Card never inspected", body = crate::errors::ErrorResponse),
    ),
    tag = "qa"
)]
pub async fn get_report(
    State(state): State<AppState>,
    Path(job_card_id): Path<Uuid>,
) -> Result<Json<ApiResponse<qa_report::Model>>, ServiceError> {
    let report = state
        .services
        .qa
        .get_report_for_job_card(job_card_id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("no inspection report for job card {}", job_card_id))
        })?;

    Ok(Json(ApiResponse::success(report)))
}
