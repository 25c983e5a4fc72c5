use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Prodflow API",
        version = "0.3.0",
        description = r#"
# Prodflow Production Workflow API

Tracks production plans through a fixed eleven-step pipeline: job cards carry
quantity through the steps, a QA gate at step 10 splits each lot into accepted
and rejected units, and rejections resolve into rework, scrap, accept or
return.

## Error Handling

Errors share one response shape:

```json
{
  "kind": "capacity_exceeded",
  "message": "...",
  "retryable": false,
  "timestamp": "2024-01-01T00:00:00Z"
}
```

`retryable` is true only for transient conflicts worth retrying as-is.

## Pagination

List endpoints take `page` (default 1) and `limit` (default 20).
        "#,
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "plans", description = "Production plan management"),
        (name = "job-cards", description = "Job card lifecycle and step transitions"),
        (name = "qa", description = "QA gate inspections"),
        (name = "rejections", description = "Rejection resolution"),
        (name = "materials", description = "Material request ledger"),
        (name = "steps", description = "Static step catalog"),
    ),
    paths(
        // Plans
        crate::handlers::plans::create_plan,
        crate::handlers::plans::list_plans,
        crate::handlers::plans::list_urgent_plans,
        crate::handlers::plans::get_plan,
        crate::handlers::plans::update_plan,
        crate::handlers::plans::get_plan_progress,
        crate::handlers::plans::list_plan_job_cards,
        crate::handlers::plans::list_plan_rejections,
        crate::handlers::plans::list_plan_material_requests,

        // Job cards
        crate::handlers::job_cards::create_job_card,
        crate::handlers::job_cards::get_job_card,
        crate::handlers::job_cards::advance_step,
        crate::handlers::job_cards::hold_job_card,
        crate::handlers::job_cards::resume_job_card,
        crate::handlers::job_cards::set_urgent,
        crate::handlers::job_cards::get_history,
        crate::handlers::job_cards::get_dwell_time,

        // QA
        crate::handlers::qa::submit_inspection,
        crate::handlers::qa::get_report,

        // Rejections
        crate::handlers::rejections::get_rejection,
        crate::handlers::rejections::resolve_rejection,

        // Materials
        crate::handlers::materials::create_request,
        crate::handlers::materials::get_request,
        crate::handlers::materials::record_fulfillment,

        // Steps
        crate::handlers::steps::list_steps,
        crate::handlers::steps::get_step,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::ListQuery,

            crate::entities::production_plan::Model,
            crate::entities::job_card::Model,
            crate::entities::job_card::JobCardStatus,
            crate::entities::step_transition::Model,
            crate::entities::qa_report::Model,
            crate::entities::rejection::Model,
            crate::entities::rejection::Severity,
            crate::entities::rejection::ResolutionAction,
            crate::entities::material_request::Model,

            crate::services::aggregation::PlanProgress,

            crate::handlers::plans::CreatePlanRequest,
            crate::handlers::plans::UpdatePlanRequest,
            crate::handlers::job_cards::CreateJobCardRequest,
            crate::handlers::job_cards::AdvanceStepRequest,
            crate::handlers::job_cards::HoldRequest,
            crate::handlers::job_cards::SetUrgentRequest,
            crate::handlers::job_cards::DwellTimeResponse,
            crate::handlers::qa::SubmitInspectionRequest,
            crate::handlers::rejections::ResolveRejectionRequest,
            crate::handlers::materials::CreateMaterialRequest,
            crate::handlers::materials::RecordFulfillmentRequest,
            crate::handlers::steps::StepResponse,

            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Prodflow API"));
        assert!(json.contains("/api/v1/plans"));
        assert!(json.contains("/api/v1/job-cards"));
    }
}
