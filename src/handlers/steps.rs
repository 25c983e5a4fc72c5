use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    steps::{self, Step, QA_GATE_STEP},
    ApiResponse, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct StepResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub is_qa_gate: bool,
}

impl From<&'static Step> for StepResponse {
    fn from(step: &'static Step) -> Self {
        Self {
            id: step.id,
            name: step.name.to_string(),
            description: step.description.to_string(),
            is_qa_gate: step.id == QA_GATE_STEP,
        }
    }
}

pub fn steps_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_steps))
        .route("/:id", get(get_step))
}

#[utoipa::path(
    get,
    path = "/api/v1/steps",
    responses(
        (status = 200, description = "The fixed step pipeline, in order", body = ApiResponse<Vec<StepResponse>>),
    ),
    tag = "steps"
)]
pub async fn list_steps(
    State(_state): State<AppState>,
) -> Json<ApiResponse<Vec<StepResponse>>> {
    let steps = steps::list_steps().iter().map(StepResponse::from).collect();
    Json(ApiResponse::success(steps))
}

#[utoipa::path(
    get,
    path = "/api/v1/steps/{id}",
    params(("id" = i32, Path, description = "Step id, 1-11")),
    responses(
        (status = 200, description = "Step retrieved", body = ApiResponse<StepResponse>),
        (status = 400, description = "Unknown step", body = crate::errors::ErrorResponse),
    ),
    tag = "steps"
)]
pub async fn get_step(
    State(_state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<StepResponse>>, ServiceError> {
    let step = steps::get_step(id)?;
    Ok(Json(ApiResponse::success(StepResponse::from(step))))
}
