use std::sync::Arc;

use chrono::{Duration, Utc};
use metrics::{counter, histogram};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use sea_orm::sea_query::Expr;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        job_card::{self, Entity as JobCardEntity, JobCardStatus},
        production_plan::{self, Entity as PlanEntity},
        qa_report::{self, Entity as QaReportEntity},
        rejection::{self, Entity as RejectionEntity, ResolutionAction},
        step_transition::{self, Entity as TransitionEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    steps::{self, FINAL_STEP, FIRST_STEP, QA_GATE_STEP},
};

/// Parameters for creating a job card against a plan.
#[derive(Debug, Clone)]
pub struct CreateJobCardCommand {
    pub plan_id: Uuid,
    pub quantity: i32,
    /// Overrides the plan's urgent flag when set.
    pub urgent: Option<bool>,
}

/// Parameters for advancing a job card one or more steps forward.
#[derive(Debug, Clone)]
pub struct AdvanceStepCommand {
    pub job_card_id: Uuid,
    pub target_step: i32,
    /// The step the caller last observed. When supplied and stale, the call
    /// fails with `ConcurrentModification` without touching state.
    pub expected_current_step: Option<i32>,
    pub notes: Option<String>,
}

/// Service owning job card records and their transition log.
///
/// Every successful advance appends exactly one step transition; the
/// transition log and the card's cached `current_step` are written in a
/// single transaction, so the log never develops gaps.
#[derive(Clone)]
pub struct JobCardService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl JobCardService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates a job card and its initial step transition.
    ///
    /// The capacity check and insert share one transaction, closing the
    /// read-then-write race between concurrent creations on the same plan.
    #[instrument(skip(self))]
    pub async fn create_job_card(
        &self,
        command: CreateJobCardCommand,
        actor_id: Uuid,
    ) -> Result<job_card::Model, ServiceError> {
        if command.quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "job card quantity must be positive, got {}",
                command.quantity
            )));
        }

        let txn = self.db.begin().await?;

        let plan = PlanEntity::find_by_id(command.plan_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("plan {} not found", command.plan_id)))?;

        let urgent = command.urgent.unwrap_or(plan.urgent);
        let created = insert_job_card(&txn, &plan, command.quantity, urgent, None, actor_id).await?;

        txn.commit().await?;

        counter!("prodflow.job_cards.created", 1);
        histogram!("prodflow.job_cards.quantity", command.quantity as f64);

        self.event_sender
            .send_or_log(Event::JobCardCreated {
                job_card: created.clone(),
            })
            .await;

        info!(job_card_id = %created.id, plan_id = %plan.id, quantity = created.quantity, "job card created");

        Ok(created)
    }

    /// Advances a job card to a later step, appending one transition.
    ///
    /// Backward moves never happen here; rework restarts rejected quantity on
    /// a brand-new card instead of rewinding this one.
    #[instrument(skip(self))]
    pub async fn advance_step(
        &self,
        command: AdvanceStepCommand,
        actor_id: Uuid,
    ) -> Result<job_card::Model, ServiceError> {
        steps::get_step(command.target_step)?;

        let txn = self.db.begin().await?;

        let card = JobCardEntity::find_by_id(command.job_card_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("job card {} not found", command.job_card_id))
            })?;

        if let Some(expected) = command.expected_current_step {
            if expected != card.current_step {
                return Err(ServiceError::ConcurrentModification(card.id));
            }
        }

        if card.status == JobCardStatus::OnHold {
            return Err(ServiceError::InvalidTransition(format!(
                "job card {} is on hold",
                card.id
            )));
        }
        if card.status.is_terminal() {
            return Err(ServiceError::InvalidTransition(format!(
                "job card {} is {:?} and admits no further transitions",
                card.id, card.status
            )));
        }
        if command.target_step <= card.current_step {
            return Err(ServiceError::InvalidTransition(format!(
                "target step {} is not after current step {}",
                command.target_step, card.current_step
            )));
        }
        if card.current_step < QA_GATE_STEP && command.target_step > QA_GATE_STEP {
            return Err(ServiceError::InvalidTransition(format!(
                "cannot skip the QA gate (step {})",
                QA_GATE_STEP
            )));
        }
        if card.current_step == QA_GATE_STEP {
            self.check_qa_gate_cleared(&txn, &card).await?;
        }

        let new_status = status_for_step(command.target_step);
        let now = Utc::now();

        // Optimistic write: the version filter loses the race to whichever
        // writer committed first, keeping the transition log gap-free.
        let result = JobCardEntity::update_many()
            .col_expr(job_card::Column::CurrentStep, Expr::value(command.target_step))
            .col_expr(job_card::Column::Status, Expr::value(new_status))
            .col_expr(
                job_card::Column::Version,
                Expr::col(job_card::Column::Version).add(1),
            )
            .col_expr(job_card::Column::UpdatedAt, Expr::value(now))
            .filter(job_card::Column::Id.eq(card.id))
            .filter(job_card::Column::Version.eq(card.version))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(card.id));
        }

        let from_step = card.current_step;
        append_transition(
            &txn,
            card.id,
            Some(from_step),
            command.target_step,
            actor_id,
            command.notes,
        )
        .await?;

        txn.commit().await?;

        counter!("prodflow.job_cards.advanced", 1);
        if new_status == JobCardStatus::Completed {
            counter!("prodflow.job_cards.completed", 1);
        }

        let updated = job_card::Model {
            current_step: command.target_step,
            status: new_status,
            version: card.version + 1,
            updated_at: now,
            ..card
        };

        self.event_sender
            .send_or_log(Event::JobCardAdvanced {
                job_card: updated.clone(),
                from_step,
                to_step: command.target_step,
            })
            .await;

        info!(
            job_card_id = %updated.id,
            to_step = command.target_step,
            status = ?updated.status,
            "job card advanced"
        );

        Ok(updated)
    }

    /// Preconditions for leaving the QA-gate step: an inspection happened and
    /// any rejection it raised has been resolved.
    async fn check_qa_gate_cleared<C: ConnectionTrait>(
        &self,
        conn: &C,
        card: &job_card::Model,
    ) -> Result<(), ServiceError> {
        let report = QaReportEntity::find()
            .filter(qa_report::Column::JobCardId.eq(card.id))
            .one(conn)
            .await?;
        if report.is_none() {
            return Err(ServiceError::InvalidTransition(format!(
                "job card {} requires an inspection before leaving the QA gate",
                card.id
            )));
        }

        let unresolved = RejectionEntity::find()
            .filter(rejection::Column::JobCardId.eq(card.id))
            .filter(rejection::Column::IsResolved.eq(false))
            .one(conn)
            .await?;
        if unresolved.is_some() {
            return Err(ServiceError::InvalidTransition(format!(
                "job card {} has an unresolved rejection at the QA gate",
                card.id
            )));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_job_card(&self, job_card_id: Uuid) -> Result<job_card::Model, ServiceError> {
        JobCardEntity::find_by_id(job_card_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("job card {} not found", job_card_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_job_cards_for_plan(
        &self,
        plan_id: Uuid,
    ) -> Result<Vec<job_card::Model>, ServiceError> {
        let cards = JobCardEntity::find()
            .filter(job_card::Column::PlanId.eq(plan_id))
            .order_by_asc(job_card::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(cards)
    }

    /// Full transition history for a card, oldest first.
    ///
    /// Transitions for one card are forward-only, so `to_step` breaks ties
    /// between entries sharing a timestamp tick.
    #[instrument(skip(self))]
    pub async fn history(
        &self,
        job_card_id: Uuid,
    ) -> Result<Vec<step_transition::Model>, ServiceError> {
        let transitions = TransitionEntity::find()
            .filter(step_transition::Column::JobCardId.eq(job_card_id))
            .order_by_asc(step_transition::Column::CreatedAt)
            .order_by_asc(step_transition::Column::ToStep)
            .all(&*self.db)
            .await?;

        Ok(transitions)
    }

    /// Time the card spent in `step_id`: entry transition to exit transition.
    /// `None` while the card has not yet left the step.
    #[instrument(skip(self))]
    pub async fn dwell_time(
        &self,
        job_card_id: Uuid,
        step_id: i32,
    ) -> Result<Option<Duration>, ServiceError> {
        steps::get_step(step_id)?;
        let history = self.history(job_card_id).await?;

        let entered = history.iter().find(|t| t.to_step == step_id);
        let left = history.iter().find(|t| t.from_step == Some(step_id));

        Ok(match (entered, left) {
            (Some(entry), Some(exit)) => Some(exit.created_at - entry.created_at),
            _ => None,
        })
    }

    /// Puts a job card on hold. Only pending or in-progress cards can be
    /// held; a card parked at the QA gate is already stationary.
    #[instrument(skip(self))]
    pub async fn hold_job_card(
        &self,
        job_card_id: Uuid,
        reason: Option<String>,
        actor_id: Uuid,
    ) -> Result<job_card::Model, ServiceError> {
        let card = self.get_job_card(job_card_id).await?;

        if !matches!(
            card.status,
            JobCardStatus::Pending | JobCardStatus::InProgress
        ) {
            return Err(ServiceError::InvalidTransition(format!(
                "cannot hold job card in status {:?}",
                card.status
            )));
        }

        let updated = self
            .set_status_guarded(&card, JobCardStatus::OnHold)
            .await?;

        counter!("prodflow.job_cards.on_hold", 1);
        self.event_sender
            .send_or_log(Event::JobCardOnHold {
                job_card: updated.clone(),
                reason,
            })
            .await;

        Ok(updated)
    }

    /// Resumes a held card to the status its position implies.
    #[instrument(skip(self))]
    pub async fn resume_job_card(
        &self,
        job_card_id: Uuid,
        actor_id: Uuid,
    ) -> Result<job_card::Model, ServiceError> {
        let card = self.get_job_card(job_card_id).await?;

        if card.status != JobCardStatus::OnHold {
            return Err(ServiceError::InvalidTransition(format!(
                "job card {} is not on hold",
                card.id
            )));
        }

        let resumed_status = if card.current_step == QA_GATE_STEP {
            JobCardStatus::QaPending
        } else if card.current_step > FIRST_STEP {
            JobCardStatus::InProgress
        } else {
            JobCardStatus::Pending
        };

        let updated = self.set_status_guarded(&card, resumed_status).await?;

        counter!("prodflow.job_cards.resumed", 1);
        self.event_sender
            .send_or_log(Event::JobCardResumed {
                job_card: updated.clone(),
            })
            .await;

        Ok(updated)
    }

    /// Overrides the urgent flag inherited from the plan at creation.
    #[instrument(skip(self))]
    pub async fn set_urgent(
        &self,
        job_card_id: Uuid,
        urgent: bool,
        actor_id: Uuid,
    ) -> Result<job_card::Model, ServiceError> {
        let card = self.get_job_card(job_card_id).await?;

        let mut active: job_card::ActiveModel = card.into();
        active.urgent = Set(urgent);
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    /// Version-guarded status write shared by hold and resume.
    async fn set_status_guarded(
        &self,
        card: &job_card::Model,
        status: JobCardStatus,
    ) -> Result<job_card::Model, ServiceError> {
        let now = Utc::now();
        let result = JobCardEntity::update_many()
            .col_expr(job_card::Column::Status, Expr::value(status))
            .col_expr(
                job_card::Column::Version,
                Expr::col(job_card::Column::Version).add(1),
            )
            .col_expr(job_card::Column::UpdatedAt, Expr::value(now))
            .filter(job_card::Column::Id.eq(card.id))
            .filter(job_card::Column::Version.eq(card.version))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(card.id));
        }

        Ok(job_card::Model {
            status,
            version: card.version + 1,
            updated_at: now,
            ..card.clone()
        })
    }
}

/// Status implied by arriving at a step.
fn status_for_step(step: i32) -> JobCardStatus {
    if step == QA_GATE_STEP {
        JobCardStatus::QaPending
    } else if step == FINAL_STEP {
        JobCardStatus::Completed
    } else {
        JobCardStatus::InProgress
    }
}

/// Quantity already committed against a plan's total.
///
/// Resolved rejections with action rework/scrap/return are subtracted: those
/// units either left the plan or re-entered it under a new card, so counting
/// both the original card and the resolution would double-book them.
pub(crate) async fn committed_quantity<C: ConnectionTrait>(
    conn: &C,
    plan_id: Uuid,
) -> Result<i64, ServiceError> {
    let cards = JobCardEntity::find()
        .filter(job_card::Column::PlanId.eq(plan_id))
        .all(conn)
        .await?;
    let card_total: i64 = cards.iter().map(|c| c.quantity as i64).sum();

    let resolved = RejectionEntity::find()
        .filter(rejection::Column::PlanId.eq(plan_id))
        .filter(rejection::Column::IsResolved.eq(true))
        .all(conn)
        .await?;
    let released: i64 = resolved
        .iter()
        .filter(|r| {
            matches!(
                r.resolution_action,
                Some(ResolutionAction::Rework)
                    | Some(ResolutionAction::Scrap)
                    | Some(ResolutionAction::Return)
            )
        })
        .map(|r| r.rejected_quantity as i64)
        .sum();

    Ok(card_total - released)
}

/// Inserts a job card plus its initial transition, enforcing plan capacity.
/// Shared with the rework path, which runs it inside its own transaction.
pub(crate) async fn insert_job_card<C: ConnectionTrait>(
    conn: &C,
    plan: &production_plan::Model,
    quantity: i32,
    urgent: bool,
    rework_of: Option<Uuid>,
    actor_id: Uuid,
) -> Result<job_card::Model, ServiceError> {
    let committed = committed_quantity(conn, plan.id).await?;
    if committed + quantity as i64 > plan.total_quantity as i64 {
        return Err(ServiceError::CapacityExceeded(format!(
            "plan {} has {} units of capacity left, requested {}",
            plan.id,
            (plan.total_quantity as i64 - committed).max(0),
            quantity
        )));
    }

    let now = Utc::now();
    let card = job_card::ActiveModel {
        id: Set(Uuid::new_v4()),
        plan_id: Set(plan.id),
        quantity: Set(quantity),
        current_step: Set(FIRST_STEP),
        status: Set(JobCardStatus::Pending),
        accepted_quantity: Set(None),
        rejected_quantity: Set(None),
        urgent: Set(urgent),
        rework_of: Set(rework_of),
        version: Set(0),
        created_by: Set(actor_id),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = card.insert(conn).await?;

    append_transition(conn, created.id, None, FIRST_STEP, actor_id, None).await?;

    Ok(created)
}

/// Appends one entry to the append-only transition log.
pub(crate) async fn append_transition<C: ConnectionTrait>(
    conn: &C,
    job_card_id: Uuid,
    from_step: Option<i32>,
    to_step: i32,
    actor_id: Uuid,
    notes: Option<String>,
) -> Result<step_transition::Model, ServiceError> {
    let transition = step_transition::ActiveModel {
        id: Set(Uuid::new_v4()),
        job_card_id: Set(job_card_id),
        from_step: Set(from_step),
        to_step: Set(to_step),
        actor_id: Set(actor_id),
        notes: Set(notes),
        created_at: Set(Utc::now()),
    };

    Ok(transition.insert(conn).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_step_position() {
        assert_eq!(status_for_step(2), JobCardStatus::InProgress);
        assert_eq!(status_for_step(QA_GATE_STEP), JobCardStatus::QaPending);
        assert_eq!(status_for_step(FINAL_STEP), JobCardStatus::Completed);
    }
}
