use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, histogram};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    TransactionTrait,
};
use sea_orm::sea_query::Expr;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        job_card::{self, Entity as JobCardEntity, JobCardStatus},
        qa_report::{self, Entity as QaReportEntity},
        rejection::{self, Entity as RejectionEntity, Severity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::job_cards::append_transition,
    steps::{FINAL_STEP, QA_GATE_STEP},
};

/// Parameters for submitting an inspection at the QA gate.
#[derive(Debug, Clone)]
pub struct SubmitInspectionCommand {
    pub job_card_id: Uuid,
    pub accepted_quantity: i32,
    pub rejected_quantity: i32,
    /// 0-100
    pub quality_score: i32,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// Service guarding the transition out of the inspection step.
#[derive(Clone)]
pub struct QaService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl QaService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Records the one inspection a job card receives in its lifetime.
    ///
    /// A clean pass (zero rejected) advances the card past the gate in the
    /// same transaction. Any rejected quantity raises an unresolved
    /// [`rejection::Model`] and parks the card at the gate until the
    /// rejection is resolved. Re-inspection of reworked material belongs to
    /// the spawned rework card, never this one.
    #[instrument(skip(self))]
    pub async fn submit_inspection(
        &self,
        command: SubmitInspectionCommand,
        actor_id: Uuid,
    ) -> Result<qa_report::Model, ServiceError> {
        if command.accepted_quantity < 0 || command.rejected_quantity < 0 {
            return Err(ServiceError::InvalidInspection(
                "accepted and rejected quantities must be non-negative".to_string(),
            ));
        }
        if !(0..=100).contains(&command.quality_score) {
            return Err(ServiceError::InvalidInspection(format!(
                "quality score must be 0-100, got {}",
                command.quality_score
            )));
        }
        if command.rejected_quantity > 0 && command.reason.is_none() {
            return Err(ServiceError::InvalidInspection(
                "a rejection reason is required when rejecting quantity".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let card = JobCardEntity::find_by_id(command.job_card_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("job card {} not found", command.job_card_id))
            })?;

        if card.status != JobCardStatus::QaPending || card.current_step != QA_GATE_STEP {
            return Err(ServiceError::InvalidInspection(format!(
                "job card {} is not awaiting inspection (step {}, status {:?})",
                card.id, card.current_step, card.status
            )));
        }

        let existing = QaReportEntity::find()
            .filter(qa_report::Column::JobCardId.eq(card.id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::AlreadyInspected(card.id));
        }

        if command.accepted_quantity + command.rejected_quantity != card.quantity {
            return Err(ServiceError::InvalidInspection(format!(
                "accepted {} + rejected {} must equal job card quantity {}",
                command.accepted_quantity, command.rejected_quantity, card.quantity
            )));
        }

        let now = Utc::now();
        let report = qa_report::ActiveModel {
            id: Set(Uuid::new_v4()),
            job_card_id: Set(card.id),
            qa_actor_id: Set(actor_id),
            accepted_quantity: Set(command.accepted_quantity),
            rejected_quantity: Set(command.rejected_quantity),
            quality_score: Set(command.quality_score),
            notes: Set(command.notes.clone()),
            inspected_at: Set(now),
        };
        let report = report.insert(&txn).await?;

        // Record the split on the card. Version-guarded like every card write.
        let clean_pass = command.rejected_quantity == 0;
        let (new_step, new_status) = if clean_pass {
            (FINAL_STEP, JobCardStatus::Completed)
        } else {
            (QA_GATE_STEP, JobCardStatus::QaPending)
        };

        let result = JobCardEntity::update_many()
            .col_expr(
                job_card::Column::AcceptedQuantity,
                Expr::value(Some(command.accepted_quantity)),
            )
            .col_expr(
                job_card::Column::RejectedQuantity,
                Expr::value(Some(command.rejected_quantity)),
            )
            .col_expr(job_card::Column::CurrentStep, Expr::value(new_step))
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

        if clean_pass {
            append_transition(
                &txn,
                card.id,
                Some(QA_GATE_STEP),
                FINAL_STEP,
                actor_id,
                Some("clean QA pass".to_string()),
            )
            .await?;
        } else {
            let rejection = rejection::ActiveModel {
                id: Set(Uuid::new_v4()),
                qa_report_id: Set(report.id),
                job_card_id: Set(card.id),
                plan_id: Set(card.plan_id),
                rejected_quantity: Set(command.rejected_quantity),
                reason: Set(command
                    .reason
                    .clone()
                    .unwrap_or_else(|| "unspecified defect".to_string())),
                severity: Set(severity_for(command.rejected_quantity, card.quantity)),
                is_resolved: Set(false),
                resolution_action: Set(None),
                resolution_notes: Set(None),
                resolved_by: Set(None),
                resolved_at: Set(None),
                rework_job_card_id: Set(None),
                created_at: Set(now),
            };
            rejection.insert(&txn).await?;
        }

        txn.commit().await?;

        counter!("prodflow.inspections.submitted", 1);
        histogram!(
            "prodflow.inspections.quality_score",
            command.quality_score as f64
        );
        if !clean_pass {
            counter!("prodflow.rejections.raised", 1);
            histogram!(
                "prodflow.rejections.quantity",
                command.rejected_quantity as f64
            );
        }

        self.event_sender
            .send_or_log(Event::InspectionSubmitted {
                report: report.clone(),
            })
            .await;

        info!(
            job_card_id = %card.id,
            accepted = command.accepted_quantity,
            rejected = command.rejected_quantity,
            score = command.quality_score,
            "inspection submitted"
        );

        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn get_report_for_job_card(
        &self,
        job_card_id: Uuid,
    ) -> Result<Option<qa_report::Model>, ServiceError> {
        let report = QaReportEntity::find()
            .filter(qa_report::Column::JobCardId.eq(job_card_id))
            .one(&*self.db)
            .await?;

        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn list_open_rejections_for_plan(
        &self,
        plan_id: Uuid,
    ) -> Result<Vec<rejection::Model>, ServiceError> {
        let rejections = RejectionEntity::find()
            .filter(rejection::Column::PlanId.eq(plan_id))
            .filter(rejection::Column::IsResolved.eq(false))
            .all(&*self.db)
            .await?;

        Ok(rejections)
    }
}

/// Severity derived from the rejected fraction of the lot.
fn severity_for(rejected: i32, quantity: i32) -> Severity {
    debug_assert!(quantity > 0);
    let fraction = rejected as f64 / quantity as f64;
    if fraction >= 0.5 {
        Severity::High
    } else if fraction >= 0.2 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn severity_thresholds() {
        assert_eq!(severity_for(5, 100), Severity::Low);
        assert_eq!(severity_for(20, 100), Severity::Medium);
        assert_eq!(severity_for(50, 100), Severity::High);
        assert_eq!(severity_for(100, 100), Severity::High);
    }

    proptest! {
        /// More rejects out of the same lot never lowers the severity.
        #[test]
        fn severity_is_monotonic(quantity in 1i32..10_000, a in 0i32..10_000, b in 0i32..10_000) {
            let (lo, hi) = (a.min(b).min(quantity), a.max(b).min(quantity));
            let rank = |s: Severity| match s {
                Severity::Low => 0,
                Severity::Medium => 1,
                Severity::High => 2,
            };
            prop_assert!(rank(severity_for(lo, quantity)) <= rank(severity_for(hi, quantity)));
        }
    }
}
