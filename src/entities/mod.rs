//! Sea-ORM entities for the job-card workflow.

pub mod job_card;
pub mod material_request;
pub mod production_plan;
pub mod qa_report;
pub mod rejection;
pub mod step_transition;

pub mod prelude {
    pub use super::job_card::Entity as JobCard;
    pub use super::material_request::Entity as MaterialRequest;
    pub use super::production_plan::Entity as ProductionPlan;
    pub use super::qa_report::Entity as QaReport;
    pub use super::rejection::Entity as Rejection;
    pub use super::step_transition::Entity as StepTransition;
}
