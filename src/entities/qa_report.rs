use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Inspection record produced at the QA gate.
///
/// At most one report exists per job card (`job_card_id` is unique);
/// re-inspection of reworked material belongs to the spawned rework card.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "qa_reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub job_card_id: Uuid,
    pub qa_actor_id: Uuid,
    pub accepted_quantity: i32,
    pub rejected_quantity: i32,
    /// 0-100
    pub quality_score: i32,
    pub notes: Option<String>,
    pub inspected_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::job_card::Entity",
        from = "Column::JobCardId",
        to = "super::job_card::Column::Id"
    )]
    JobCard,
    #[sea_orm(has_many = "super::rejection::Entity")]
    Rejections,
}

impl Related<super::job_card::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JobCard.def()
    }
}

impl Related<super::rejection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rejections.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
