use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only record of a state-changing operation. Written after the
/// triggering transaction commits; never mutated or deleted by normal flows.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub entity: String,
    pub record_id: String,
    #[sea_orm(column_type = "Json", nullable)]
    pub before_value: Option<Json>,
    #[sea_orm(column_type = "Json", nullable)]
    pub after_value: Option<Json>,
    pub store_id: Option<Uuid>,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
