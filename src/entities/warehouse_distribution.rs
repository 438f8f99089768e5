use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One line item of a warehouse-to-store shipment.
///
/// Rows created by the same shipment share a `batch_id` generated at creation
/// time; the batch itself is never persisted as its own entity. Its aggregate
/// state is derived from the member rows.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "warehouse_distributions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub batch_id: Uuid,
    pub invoice_number: String,
    pub quantity: i32,
    pub total_amount: i64,
    pub status: DistributionStatus,
    pub distributed_at: DateTime<Utc>,
    pub distributed_by: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::StoreId",
        to = "super::store::Column::Id"
    )]
    Store,
    #[sea_orm(
        belongs_to = "super::warehouse_product::Entity",
        from = "Column::ProductId",
        to = "super::warehouse_product::Column::Id"
    )]
    Product,
}

impl Related<super::store::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Store.def()
    }
}

impl Related<super::warehouse_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Per-row distribution state machine. `PendingAcceptance` is the only state
/// from which accept/reject transitions are allowed; the rest are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum DistributionStatus {
    #[sea_orm(string_value = "PENDING_ACCEPTANCE")]
    PendingAcceptance,
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl DistributionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, DistributionStatus::PendingAcceptance)
    }
}
