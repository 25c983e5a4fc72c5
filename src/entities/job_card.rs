use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum JobCardStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    /// Parked at the QA gate awaiting inspection or rejection resolution.
    #[sea_orm(string_value = "qa_pending")]
    QaPending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "on_hold")]
    OnHold,
    /// Terminal: the whole lot was rejected and resolved away from the card.
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl JobCardStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }
}

/// A trackable batch of units moving through the pipeline as a unit.
///
/// `current_step` is a cached projection of the latest step transition's
/// `to_step`; the transition log is the authoritative history. `version` is
/// the optimistic-concurrency counter bumped on every mutation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "job_cards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub plan_id: Uuid,
    /// Immutable after creation.
    pub quantity: i32,
    pub current_step: i32,
    pub status: JobCardStatus,
    /// Null until the card passes the QA gate.
    pub accepted_quantity: Option<i32>,
    pub rejected_quantity: Option<i32>,
    pub urgent: bool,
    /// Originating card when this card was spawned by a rework resolution.
    pub rework_of: Option<Uuid>,
    pub version: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::production_plan::Entity",
        from = "Column::PlanId",
        to = "super::production_plan::Column::Id"
    )]
    ProductionPlan,
    #[sea_orm(has_many = "super::step_transition::Entity")]
    StepTransitions,
    #[sea_orm(has_many = "super::rejection::Entity")]
    Rejections,
}

impl Related<super::production_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductionPlan.def()
    }
}

impl Related<super::step_transition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StepTransitions.def()
    }
}

impl Related<super::rejection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rejections.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
