//! Workflow services, one per component of the engine.

pub mod aggregation;
pub mod job_cards;
pub mod materials;
pub mod plans;
pub mod qa;
pub mod rejections;

pub use aggregation::PlanAggregator;
pub use job_cards::JobCardService;
pub use materials::MaterialRequestService;
pub use plans::PlanService;
pub use qa::QaService;
pub use rejections::RejectionService;
