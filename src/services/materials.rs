use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, histogram};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use sea_orm::sea_query::Expr;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        material_request::{self, Entity as MaterialRequestEntity},
        production_plan::Entity as PlanEntity,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Ledger of requested vs. fulfilled input material per plan.
///
/// The ledger tracks quantities only; it does not gate job card creation.
/// Whether a card may leave step 1 before its plan's material arrived is a
/// policy question for the orchestrating caller, answered by `is_fulfilled`.
#[derive(Clone)]
pub struct MaterialRequestService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl MaterialRequestService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn request_material(
        &self,
        plan_id: Uuid,
        requested_quantity: i32,
        job_card_id: Option<Uuid>,
        actor_id: Uuid,
    ) -> Result<material_request::Model, ServiceError> {
        if requested_quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "requested quantity must be positive, got {}",
                requested_quantity
            )));
        }

        // Requests are always raised against an existing plan.
        PlanEntity::find_by_id(plan_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("plan {} not found", plan_id)))?;

        let request = material_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            plan_id: Set(plan_id),
            job_card_id: Set(job_card_id),
            requested_quantity: Set(requested_quantity),
            sent_quantity: Set(0),
            created_by: Set(actor_id),
            created_at: Set(Utc::now()),
            fulfilled_at: Set(None),
        };

        let created = request.insert(&*self.db).await?;

        counter!("prodflow.material_requests.created", 1);
        self.event_sender
            .send_or_log(Event::MaterialRequested {
                request: created.clone(),
            })
            .await;

        info!(request_id = %created.id, plan_id = %plan_id, quantity = requested_quantity, "material requested");

        Ok(created)
    }

    /// Records a delivery against a request. `sent_quantity` is an additive
    /// delta; partial fulfillment across multiple deliveries is expected.
    /// The running total never decreases and never exceeds the requested
    /// quantity.
    #[instrument(skip(self))]
    pub async fn record_fulfillment(
        &self,
        request_id: Uuid,
        sent_quantity: i32,
    ) -> Result<material_request::Model, ServiceError> {
        if sent_quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "sent quantity must be positive, got {}",
                sent_quantity
            )));
        }

        let txn = self.db.begin().await?;

        let request = MaterialRequestEntity::find_by_id(request_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("material request {} not found", request_id))
            })?;

        let new_total = request.sent_quantity + sent_quantity;
        if new_total > request.requested_quantity {
            return Err(ServiceError::OverFulfillment(format!(
                "sending {} would bring request {} to {}/{} units",
                sent_quantity, request.id, new_total, request.requested_quantity
            )));
        }

        let now = Utc::now();
        let fulfilled_at = if new_total >= request.requested_quantity {
            Some(now)
        } else {
            None
        };

        // Guarded on the observed running total so two racing deliveries
        // cannot jointly overshoot the requested quantity.
        let result = MaterialRequestEntity::update_many()
            .col_expr(
                material_request::Column::SentQuantity,
                Expr::value(new_total),
            )
            .col_expr(
                material_request::Column::FulfilledAt,
                Expr::value(fulfilled_at),
            )
            .filter(material_request::Column::Id.eq(request.id))
            .filter(material_request::Column::SentQuantity.eq(request.sent_quantity))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(request.id));
        }

        txn.commit().await?;

        histogram!("prodflow.material_requests.sent", sent_quantity as f64);

        let updated = material_request::Model {
            sent_quantity: new_total,
            fulfilled_at,
            ..request
        };

        if updated.is_fulfilled() {
            counter!("prodflow.material_requests.fulfilled", 1);
            self.event_sender
                .send_or_log(Event::MaterialFulfilled {
                    request: updated.clone(),
                })
                .await;
        }

        info!(
            request_id = %updated.id,
            sent = new_total,
            requested = updated.requested_quantity,
            fulfilled = updated.is_fulfilled(),
            "material fulfillment recorded"
        );

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn get_request(
        &self,
        request_id: Uuid,
    ) -> Result<material_request::Model, ServiceError> {
        MaterialRequestEntity::find_by_id(request_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("material request {} not found", request_id))
            })
    }

    #[instrument(skip(self))]
    pub async fn list_requests_for_plan(
        &self,
        plan_id: Uuid,
    ) -> Result<Vec<material_request::Model>, ServiceError> {
        let requests = MaterialRequestEntity::find()
            .filter(material_request::Column::PlanId.eq(plan_id))
            .order_by_asc(material_request::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(requests)
    }
}
