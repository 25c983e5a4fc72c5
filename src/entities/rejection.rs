use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    /// Spawn a new job card from the rejected quantity, restarting at step 1.
    #[sea_orm(string_value = "rework")]
    Rework,
    /// Material is written off; the quantity leaves the plan's producible total.
    #[sea_orm(string_value = "scrap")]
    Scrap,
    /// Override the gate: the rejected units are accepted after all.
    #[sea_orm(string_value = "accept")]
    Accept,
    /// Material returned to the supplier; leaves the producible total.
    #[sea_orm(string_value = "return")]
    Return,
}

/// An unresolved quality defect raised by a QA report, resolved exactly once.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "rejections")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub qa_report_id: Uuid,
    pub job_card_id: Uuid,
    pub plan_id: Uuid,
    pub rejected_quantity: i32,
    pub reason: String,
    pub severity: Severity,
    pub is_resolved: bool,
    pub resolution_action: Option<ResolutionAction>,
    pub resolution_notes: Option<String>,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Card spawned by a rework resolution, for traceability.
    pub rework_job_card_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::qa_report::Entity",
        from = "Column::QaReportId",
        to = "super::qa_report::Column::Id"
    )]
    QaReport,
    #[sea_orm(
        belongs_to = "super::job_card::Entity",
        from = "Column::JobCardId",
        to = "super::job_card::Column::Id"
    )]
    JobCard,
}

impl Related<super::qa_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QaReport.def()
    }
}

impl Related<super::job_card::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JobCard.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
