use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Code of the reserved SYSTEM store that acts as the virtual tenant for
/// central warehouse inventory. Seeded by migration, never created by users.
pub const WAREHOUSE_MASTER_CODE: &str = "WH-MASTER";

/// A store is the tenant boundary: every tenant-scoped entity carries a
/// `store_id` foreign key to exactly one store.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stores")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub status: StoreStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
    #[sea_orm(has_many = "super::warehouse_distribution::Entity")]
    Distributions,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::warehouse_distribution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Distributions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum StoreStatus {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    /// Reserved stores (the warehouse master) that never appear in tenant
    /// listings and cannot be mutated through the public API.
    #[sea_orm(string_value = "SYSTEM")]
    System,
}
