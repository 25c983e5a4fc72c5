use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A production plan converting a source spec into a target spec.
///
/// Progress quantities (in production / completed / rejected) are never
/// stored here; they are folds over the plan's job cards, recomputed on read.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "production_plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Catalog id of the material being converted from (opaque to the engine)
    pub source_spec_id: Uuid,
    /// Catalog id of the product being converted to (opaque to the engine)
    pub target_spec_id: Uuid,
    pub total_quantity: i32,
    pub urgent: bool,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::job_card::Entity")]
    JobCards,
    #[sea_orm(has_many = "super::material_request::Entity")]
    MaterialRequests,
}

impl Related<super::job_card::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JobCards.def()
    }
}

impl Related<super::material_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MaterialRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
