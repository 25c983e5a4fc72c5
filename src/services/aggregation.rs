use std::sync::Arc;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{
        job_card::{self, Entity as JobCardEntity, JobCardStatus},
        material_request::{self, Entity as MaterialRequestEntity},
        production_plan::Entity as PlanEntity,
        rejection::{self, Entity as RejectionEntity, ResolutionAction},
    },
    errors::ServiceError,
};

/// Derived progress of a production plan.
///
/// Every figure is computed from the job cards and rejection records at read
/// time; nothing here is stored back on the plan row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanProgress {
    pub plan_id: Uuid,
    pub total_quantity: i32,
    /// Accepted units on completed cards.
    pub completed_quantity: i32,
    /// Units on cards still moving through the pipeline.
    pub in_production_quantity: i32,
    /// Units permanently lost to scrap or returned material.
    pub rejected_quantity: i32,
    pub open_rejections: u64,
    pub job_card_count: u64,
    pub material_requested: i32,
    pub material_sent: i32,
    pub is_completed: bool,
}

/// Read-side aggregation over a plan's job cards, rejections and material
/// ledger.
#[derive(Clone)]
pub struct PlanAggregator {
    db: Arc<DatabaseConnection>,
}

impl PlanAggregator {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn plan_progress(&self, plan_id: Uuid) -> Result<PlanProgress, ServiceError> {
        let plan = PlanEntity::find_by_id(plan_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("plan {} not found", plan_id)))?;

        let cards = JobCardEntity::find()
            .filter(job_card::Column::PlanId.eq(plan_id))
            .all(&*self.db)
            .await?;

        let rejections = RejectionEntity::find()
            .filter(rejection::Column::PlanId.eq(plan_id))
            .all(&*self.db)
            .await?;

        let requests = MaterialRequestEntity::find()
            .filter(material_request::Column::PlanId.eq(plan_id))
            .all(&*self.db)
            .await?;

        let mut completed_quantity = 0;
        let mut in_production_quantity = 0;
        for card in &cards {
            match card.status {
                JobCardStatus::Completed => {
                    // A completed card always carries its QA split; a clean
                    // pass recorded accepted == quantity.
                    completed_quantity += card.accepted_quantity.unwrap_or(card.quantity);
                }
                JobCardStatus::Pending
                | JobCardStatus::InProgress
                | JobCardStatus::QaPending
                | JobCardStatus::OnHold => {
                    in_production_quantity += card.quantity;
                }
                JobCardStatus::Rejected => {}
            }
        }

        // Only scrap and return remove units from the producible total;
        // reworked units re-enter via a fresh card and accepted overrides
        // land back on the original card.
        let rejected_quantity = rejections
            .iter()
            .filter(|r| {
                matches!(
                    r.resolution_action,
                    Some(ResolutionAction::Scrap) | Some(ResolutionAction::Return)
                )
            })
            .map(|r| r.rejected_quantity)
            .sum();

        let open_rejections = rejections.iter().filter(|r| !r.is_resolved).count() as u64;

        let material_requested = requests.iter().map(|r| r.requested_quantity).sum();
        let material_sent = requests.iter().map(|r| r.sent_quantity).sum();

        let is_completed = !cards.is_empty()
            && cards.iter().all(|c| c.status.is_terminal())
            && open_rejections == 0;

        Ok(PlanProgress {
            plan_id,
            total_quantity: plan.total_quantity,
            completed_quantity,
            in_production_quantity,
            rejected_quantity,
            open_rejections,
            job_card_count: cards.len() as u64,
            material_requested,
            material_sent,
            is_completed,
        })
    }

    /// Quantity already committed to job cards, net of resolved rejections.
    /// Exposed for capacity introspection; card creation re-derives this
    /// inside its own transaction.
    #[instrument(skip(self))]
    pub async fn committed_quantity(&self, plan_id: Uuid) -> Result<i64, ServiceError> {
        crate::services::job_cards::committed_quantity(&*self.db, plan_id).await
    }
}
