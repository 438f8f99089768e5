use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, Condition, QueryOrder, TransactionTrait};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::receivable::{self, ReceivableStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::{AuditEntry, AuditService};
use crate::tenant::{StoreFilter, TenantScope};

#[derive(Clone)]
pub struct ReceivableService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    audit: Arc<AuditService>,
}

impl ReceivableService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, audit: Arc<AuditService>) -> Self {
        Self {
            db,
            event_sender,
            audit,
        }
    }

    pub async fn list_receivables(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<receivable::Model>, ServiceError> {
        scope
            .select::<receivable::Entity>(StoreFilter::default())
            .order_by_desc(receivable::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn get_receivable(
        &self,
        scope: &TenantScope,
        id: Uuid,
    ) -> Result<receivable::Model, ServiceError> {
        self.find_receivable(scope, id, &*self.db).await
    }

    /// Posts a payment against a receivable. Overpayment and payment against
    /// an already-settled balance are rejected inside the transaction, so a
    /// rejected posting leaves no state behind. An exact-balance payment
    /// settles the row as `PAID`.
    #[instrument(skip(self, scope))]
    pub async fn record_payment(
        &self,
        scope: &TenantScope,
        id: Uuid,
        amount: i64,
        actor: Uuid,
    ) -> Result<receivable::Model, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::ValidationError(
                "Payment amount must be positive".into(),
            ));
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let row = self.find_receivable(scope, id, &txn).await?;

        if row.status == ReceivableStatus::Paid {
            return Err(ServiceError::InvalidOperation(format!(
                "Receivable {} is already fully paid",
                row.id
            )));
        }
        let remaining = row.amount_due - row.amount_paid;
        if amount > remaining {
            return Err(ServiceError::ValidationError(format!(
                "Payment of {} exceeds the remaining balance of {}",
                amount, remaining
            )));
        }

        let new_paid = row.amount_paid + amount;
        let new_status = ReceivableStatus::from_amounts(new_paid, row.amount_due);
        let now = Utc::now();

        // amount_paid is re-checked in the predicate; a concurrent posting
        // that already moved the balance makes this one a Conflict.
        let result = scope
            .update_many::<receivable::Entity>(StoreFilter {
                store_id: Some(row.store_id),
                condition: Condition::all()
                    .add(receivable::Column::Id.eq(row.id))
                    .add(receivable::Column::AmountPaid.eq(row.amount_paid)),
            })
            .col_expr(receivable::Column::AmountPaid, Expr::value(new_paid))
            .col_expr(receivable::Column::Status, Expr::value(new_status))
            .col_expr(receivable::Column::UpdatedAt, Expr::value(now))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::Conflict(format!(
                "Receivable {} was modified concurrently",
                row.id
            )));
        }

        let updated = self.find_receivable(scope, id, &txn).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(receivable_id = %id, amount, status = ?updated.status, "payment recorded");
        self.audit
            .record_best_effort(AuditEntry {
                actor_id: actor,
                action: "receivable.payment".into(),
                entity: "Receivable".into(),
                record_id: row.id.to_string(),
                before_value: serde_json::to_value(&row).ok(),
                after_value: serde_json::to_value(&updated).ok(),
                store_id: Some(row.store_id),
                metadata: Some(amount.to_string()),
            })
            .await;
        self.event_sender
            .send(Event::PaymentRecorded {
                receivable_id: row.id,
                store_id: row.store_id,
                amount,
            })
            .await;

        Ok(updated)
    }

    async fn find_receivable<C: sea_orm::ConnectionTrait>(
        &self,
        scope: &TenantScope,
        id: Uuid,
        conn: &C,
    ) -> Result<receivable::Model, ServiceError> {
        scope
            .select::<receivable::Entity>(StoreFilter::with_condition(
                Condition::all().add(receivable::Column::Id.eq(id)),
            ))
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Receivable {} not found", id)))
    }
}
