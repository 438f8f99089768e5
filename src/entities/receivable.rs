use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Outstanding balance on a credit sale.
///
/// Invariants: `0 <= amount_paid <= amount_due`; `status` is recomputed from
/// the two amounts on every payment posting and never edited directly.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "receivables")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub transaction_id: Uuid,
    pub customer_name: String,
    pub amount_due: i64,
    pub amount_paid: i64,
    pub status: ReceivableStatus,
    pub due_date: Option<DateTime<Utc>>,
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
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ReceivableStatus {
    #[sea_orm(string_value = "UNPAID")]
    Unpaid,
    #[sea_orm(string_value = "PARTIALLY_PAID")]
    PartiallyPaid,
    #[sea_orm(string_value = "PAID")]
    Paid,
}

impl ReceivableStatus {
    /// Derives the status from the paid/due amounts.
    pub fn from_amounts(amount_paid: i64, amount_due: i64) -> Self {
        if amount_paid == 0 {
            ReceivableStatus::Unpaid
        } else if amount_paid < amount_due {
            ReceivableStatus::PartiallyPaid
        } else {
            ReceivableStatus::Paid
        }
    }
}
