use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use sea_orm::sea_query::Expr;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        job_card::{self, Entity as JobCardEntity, JobCardStatus},
        production_plan::Entity as PlanEntity,
        rejection::{self, Entity as RejectionEntity, ResolutionAction},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::job_cards::insert_job_card,
};

/// Service resolving quality rejections.
///
/// Resolution is terminal: a rejection resolves exactly once, and every
/// branch stamps `is_resolved`/`resolved_at` in the same transaction as its
/// side effects. Correcting a resolution requires a fresh inspection cycle
/// on a new card, which this component deliberately does not provide.
#[derive(Clone)]
pub struct RejectionService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl RejectionService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Resolves an open rejection with one of the four fixed actions.
    ///
    /// - `rework`: spawns a new job card from the rejected quantity,
    ///   restarting at step 1 with a back-reference to the rejected card.
    /// - `scrap` / `return`: the quantity permanently leaves the plan's
    ///   producible total (reflected in aggregation, never by editing the
    ///   plan); a card left with no accepted units becomes terminally
    ///   rejected.
    /// - `accept`: overrides the gate; the card's rejected quantity moves
    ///   into its accepted quantity and the card may advance again.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        rejection_id: Uuid,
        action: ResolutionAction,
        resolution_notes: Option<String>,
        actor_id: Uuid,
    ) -> Result<rejection::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let rej = RejectionEntity::find_by_id(rejection_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("rejection {} not found", rejection_id))
            })?;

        if rej.is_resolved {
            return Err(ServiceError::AlreadyResolved(rej.id));
        }

        let now = Utc::now();

        // Conditional write on is_resolved closes the double-resolve race: a
        // retried call finds zero rows and cannot spawn a second rework card.
        let result = RejectionEntity::update_many()
            .col_expr(rejection::Column::IsResolved, Expr::value(true))
            .col_expr(rejection::Column::ResolutionAction, Expr::value(Some(action)))
            .col_expr(
                rejection::Column::ResolutionNotes,
                Expr::value(resolution_notes.clone()),
            )
            .col_expr(rejection::Column::ResolvedBy, Expr::value(Some(actor_id)))
            .col_expr(rejection::Column::ResolvedAt, Expr::value(Some(now)))
            .filter(rejection::Column::Id.eq(rej.id))
            .filter(rejection::Column::IsResolved.eq(false))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::AlreadyResolved(rej.id));
        }

        let card = JobCardEntity::find_by_id(rej.job_card_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("job card {} not found", rej.job_card_id))
            })?;

        let mut rework_job_card_id = None;

        match action {
            ResolutionAction::Rework => {
                let plan = PlanEntity::find_by_id(rej.plan_id).one(&txn).await?.ok_or_else(
                    || ServiceError::NotFound(format!("plan {} not found", rej.plan_id)),
                )?;

                // The resolution just freed the rejected units, so the
                // capacity check inside insert_job_card sees them available.
                let rework_card = insert_job_card(
                    &txn,
                    &plan,
                    rej.rejected_quantity,
                    plan.urgent,
                    Some(card.id),
                    actor_id,
                )
                .await?;

                RejectionEntity::update_many()
                    .col_expr(
                        rejection::Column::ReworkJobCardId,
                        Expr::value(Some(rework_card.id)),
                    )
                    .filter(rejection::Column::Id.eq(rej.id))
                    .exec(&txn)
                    .await?;

                rework_job_card_id = Some(rework_card.id);
            }
            ResolutionAction::Accept => {
                // Gate override: the rejected units are accepted after all.
                let accepted = card.quantity;
                JobCardEntity::update_many()
                    .col_expr(
                        job_card::Column::AcceptedQuantity,
                        Expr::value(Some(accepted)),
                    )
                    .col_expr(job_card::Column::RejectedQuantity, Expr::value(Some(0)))
                    .col_expr(
                        job_card::Column::Version,
                        Expr::col(job_card::Column::Version).add(1),
                    )
                    .col_expr(job_card::Column::UpdatedAt, Expr::value(now))
                    .filter(job_card::Column::Id.eq(card.id))
                    .exec(&txn)
                    .await?;
            }
            ResolutionAction::Scrap | ResolutionAction::Return => {
                // Nothing re-enters production. A card with no surviving
                // accepted units is terminally rejected.
                if card.accepted_quantity.unwrap_or(0) == 0 {
                    JobCardEntity::update_many()
                        .col_expr(
                            job_card::Column::Status,
                            Expr::value(JobCardStatus::Rejected),
                        )
                        .col_expr(
                            job_card::Column::Version,
                            Expr::col(job_card::Column::Version).add(1),
                        )
                        .col_expr(job_card::Column::UpdatedAt, Expr::value(now))
                        .filter(job_card::Column::Id.eq(card.id))
                        .exec(&txn)
                        .await?;
                }
            }
        }

        txn.commit().await?;

        counter!("prodflow.rejections.resolved", 1, "action" => action_label(action));

        let resolved = rejection::Model {
            is_resolved: true,
            resolution_action: Some(action),
            resolution_notes,
            resolved_by: Some(actor_id),
            resolved_at: Some(now),
            rework_job_card_id,
            ..rej
        };

        self.event_sender
            .send_or_log(Event::RejectionResolved {
                rejection: resolved.clone(),
            })
            .await;

        info!(
            rejection_id = %resolved.id,
            action = action_label(action),
            rework_job_card = ?rework_job_card_id,
            "rejection resolved"
        );

        Ok(resolved)
    }

    #[instrument(skip(self))]
    pub async fn get_rejection(&self, rejection_id: Uuid) -> Result<rejection::Model, ServiceError> {
        RejectionEntity::find_by_id(rejection_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("rejection {} not found", rejection_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_rejections_for_plan(
        &self,
        plan_id: Uuid,
        only_unresolved: bool,
    ) -> Result<Vec<rejection::Model>, ServiceError> {
        let mut query = RejectionEntity::find().filter(rejection::Column::PlanId.eq(plan_id));
        if only_unresolved {
            query = query.filter(rejection::Column::IsResolved.eq(false));
        }

        let rejections = query
            .order_by_asc(rejection::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(rejections)
    }
}

fn action_label(action: ResolutionAction) -> &'static str {
    match action {
        ResolutionAction::Rework => "rework",
        ResolutionAction::Scrap => "scrap",
        ResolutionAction::Accept => "accept",
        ResolutionAction::Return => "return",
    }
}
