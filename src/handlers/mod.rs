pub mod job_cards;
pub mod materials;
pub mod plans;
pub mod qa;
pub mod rejections;
pub mod steps;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::events::EventSender;
use crate::services::{
    JobCardService, MaterialRequestService, PlanAggregator, PlanService, QaService,
    RejectionService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub plans: Arc<PlanService>,
    pub job_cards: Arc<JobCardService>,
    pub qa: Arc<QaService>,
    pub rejections: Arc<RejectionService>,
    pub materials: Arc<MaterialRequestService>,
    pub aggregation: Arc<PlanAggregator>,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            plans: Arc::new(PlanService::new(db.clone(), event_sender.clone())),
            job_cards: Arc::new(JobCardService::new(db.clone(), event_sender.clone())),
            qa: Arc::new(QaService::new(db.clone(), event_sender.clone())),
            rejections: Arc::new(RejectionService::new(db.clone(), event_sender.clone())),
            materials: Arc::new(MaterialRequestService::new(db.clone(), event_sender)),
            aggregation: Arc::new(PlanAggregator::new(db)),
        }
    }
}
