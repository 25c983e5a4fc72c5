use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::production_plan::{self, Entity as PlanEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Parameters for creating a production plan.
#[derive(Debug, Clone)]
pub struct CreatePlanCommand {
    pub source_spec_id: Uuid,
    pub target_spec_id: Uuid,
    pub total_quantity: i32,
    pub urgent: bool,
    pub notes: Option<String>,
}

/// Service for managing production plans.
///
/// A plan is created once; the only mutable fields afterwards are the urgent
/// flag and the free-text note. Progress is derived, never stored; see
/// [`crate::services::aggregation::PlanAggregator`].
#[derive(Clone)]
pub struct PlanService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl PlanService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create_plan(
        &self,
        command: CreatePlanCommand,
        actor_id: Uuid,
    ) -> Result<production_plan::Model, ServiceError> {
        if command.total_quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "total quantity must be positive, got {}",
                command.total_quantity
            )));
        }

        let now = Utc::now();
        let plan = production_plan::ActiveModel {
            id: Set(Uuid::new_v4()),
            source_spec_id: Set(command.source_spec_id),
            target_spec_id: Set(command.target_spec_id),
            total_quantity: Set(command.total_quantity),
            urgent: Set(command.urgent),
            notes: Set(command.notes),
            created_by: Set(actor_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = plan.insert(&*self.db).await?;

        counter!("prodflow.plans.created", 1);
        self.event_sender
            .send_or_log(Event::PlanCreated {
                plan: created.clone(),
            })
            .await;

        info!(plan_id = %created.id, quantity = created.total_quantity, "production plan created");

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_plan(&self, plan_id: Uuid) -> Result<production_plan::Model, ServiceError> {
        PlanEntity::find_by_id(plan_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("plan {} not found", plan_id)))
    }

    /// Updates the only mutable plan fields: urgent flag and note.
    #[instrument(skip(self))]
    pub async fn update_plan(
        &self,
        plan_id: Uuid,
        urgent: Option<bool>,
        notes: Option<Option<String>>,
    ) -> Result<production_plan::Model, ServiceError> {
        let plan = self.get_plan(plan_id).await?;

        let mut active: production_plan::ActiveModel = plan.into();
        if let Some(urgent) = urgent {
            active.urgent = Set(urgent);
        }
        if let Some(notes) = notes {
            active.notes = Set(notes);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::PlanUpdated {
                plan: updated.clone(),
            })
            .await;

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn list_plans(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<production_plan::Model>, u64), ServiceError> {
        let total = PlanEntity::find().count(&*self.db).await?;

        let plans = PlanEntity::find()
            .order_by_desc(production_plan::Column::CreatedAt)
            .offset(page.saturating_sub(1) * page_size)
            .limit(page_size)
            .all(&*self.db)
            .await?;

        Ok((plans, total))
    }

    #[instrument(skip(self))]
    pub async fn list_urgent_plans(&self) -> Result<Vec<production_plan::Model>, ServiceError> {
        let plans = PlanEntity::find()
            .filter(production_plan::Column::Urgent.eq(true))
            .order_by_desc(production_plan::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(plans)
    }
}
