use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A tracked need for input material against a plan.
///
/// Fulfillment is additive across multiple deliveries; `sent_quantity` never
/// decreases. Whether the request is fulfilled is a pure function of the two
/// quantities, never an independently settable flag.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "material_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub plan_id: Uuid,
    pub job_card_id: Option<Uuid>,
    pub requested_quantity: i32,
    pub sent_quantity: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub fulfilled_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn is_fulfilled(&self) -> bool {
        self.sent_quantity >= self.requested_quantity
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::production_plan::Entity",
        from = "Column::PlanId",
        to = "super::production_plan::Column::Id"
    )]
    ProductionPlan,
}

impl Related<super::production_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductionPlan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
