use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::product;
use crate::entities::return_product::{self, ReturnStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::{AuditEntry, AuditService};
use crate::tenant::{StoreFilter, TenantScope};

#[derive(Debug, Clone)]
pub struct CreateReturnInput {
    pub transaction_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub reason: String,
}

#[derive(Clone)]
pub struct ReturnService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    audit: Arc<AuditService>,
}

impl ReturnService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, audit: Arc<AuditService>) -> Self {
        Self {
            db,
            event_sender,
            audit,
        }
    }

    /// Files a return request in `PENDING`. The product must belong to the
    /// caller's store; quantity validation happens here, restocking only on
    /// approval.
    #[instrument(skip(self, scope, input))]
    pub async fn create_return(
        &self,
        scope: &TenantScope,
        input: CreateReturnInput,
        actor: Uuid,
    ) -> Result<return_product::Model, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Return quantity must be positive".into(),
            ));
        }
        let reason = input.reason.trim().to_string();
        if reason.is_empty() {
            return Err(ServiceError::ValidationError(
                "A return reason is required".into(),
            ));
        }

        let stock = scope
            .select::<product::Entity>(StoreFilter::with_condition(
                Condition::all().add(product::Column::Id.eq(input.product_id)),
            ))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        let now = Utc::now();
        let model = scope.stamp::<return_product::Entity, _>(return_product::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(stock.store_id),
            transaction_id: Set(input.transaction_id),
            product_id: Set(stock.id),
            attendant_id: Set(actor),
            quantity: Set(input.quantity),
            reason: Set(reason),
            status: Set(ReturnStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
        });

        let created = model
            .insert(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        info!(return_id = %created.id, store_id = %created.store_id, "return requested");
        self.audit
            .record_best_effort(AuditEntry {
                actor_id: actor,
                action: "return.create".into(),
                entity: "ReturnProduct".into(),
                record_id: created.id.to_string(),
                before_value: None,
                after_value: serde_json::to_value(&created).ok(),
                store_id: Some(created.store_id),
                metadata: None,
            })
            .await;
        self.event_sender
            .send(Event::ReturnRequested {
                return_id: created.id,
                store_id: created.store_id,
            })
            .await;

        Ok(created)
    }

    pub async fn list_returns(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<return_product::Model>, ServiceError> {
        scope
            .select::<return_product::Entity>(StoreFilter::default())
            .order_by_desc(return_product::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Approves a pending return and restocks the product in the same
    /// transaction.
    #[instrument(skip(self, scope))]
    pub async fn approve_return(
        &self,
        scope: &TenantScope,
        return_id: Uuid,
        actor: Uuid,
    ) -> Result<return_product::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let request = self.find_return(scope, return_id, &txn).await?;
        self.guard_pending(&request, "approved")?;

        let now = Utc::now();
        self.transition(scope, &request, ReturnStatus::Approved, now, &txn)
            .await?;

        let restock = scope
            .update_many::<product::Entity>(StoreFilter {
                store_id: Some(request.store_id),
                condition: Condition::all().add(product::Column::Id.eq(request.product_id)),
            })
            .col_expr(
                product::Column::Quantity,
                Expr::col(product::Column::Quantity).add(request.quantity),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(now))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if restock.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found for restock",
                request.product_id
            )));
        }

        let updated = self.find_return(scope, return_id, &txn).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(return_id = %return_id, "return approved");
        self.record_resolution(&request, "return.approve", None, actor)
            .await;
        self.event_sender
            .send(Event::ReturnApproved {
                return_id: request.id,
                store_id: request.store_id,
            })
            .await;

        Ok(updated)
    }

    /// Rejects a pending return; stock is untouched.
    #[instrument(skip(self, scope, reason))]
    pub async fn reject_return(
        &self,
        scope: &TenantScope,
        return_id: Uuid,
        reason: &str,
        actor: Uuid,
    ) -> Result<return_product::Model, ServiceError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::ValidationError(
                "A rejection reason is required".into(),
            ));
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let request = self.find_return(scope, return_id, &txn).await?;
        self.guard_pending(&request, "rejected")?;

        let now = Utc::now();
        self.transition(scope, &request, ReturnStatus::Rejected, now, &txn)
            .await?;

        let updated = self.find_return(scope, return_id, &txn).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(return_id = %return_id, "return rejected");
        self.record_resolution(&request, "return.reject", Some(reason), actor)
            .await;
        self.event_sender
            .send(Event::ReturnRejected {
                return_id: request.id,
                store_id: request.store_id,
            })
            .await;

        Ok(updated)
    }

    async fn find_return<C: sea_orm::ConnectionTrait>(
        &self,
        scope: &TenantScope,
        return_id: Uuid,
        conn: &C,
    ) -> Result<return_product::Model, ServiceError> {
        scope
            .select::<return_product::Entity>(StoreFilter::with_condition(
                Condition::all().add(return_product::Column::Id.eq(return_id)),
            ))
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Return {} not found", return_id)))
    }

    fn guard_pending(
        &self,
        request: &return_product::Model,
        verb: &str,
    ) -> Result<(), ServiceError> {
        if request.status != ReturnStatus::Pending {
            return Err(ServiceError::InvalidOperation(format!(
                "Return {} is {:?} and cannot be {}",
                request.id, request.status, verb
            )));
        }
        Ok(())
    }

    /// Conditional transition; the pending re-check in the predicate turns a
    /// concurrent resolution into a Conflict.
    async fn transition(
        &self,
        scope: &TenantScope,
        request: &return_product::Model,
        status: ReturnStatus,
        now: chrono::DateTime<Utc>,
        txn: &sea_orm::DatabaseTransaction,
    ) -> Result<(), ServiceError> {
        let result = scope
            .update_many::<return_product::Entity>(StoreFilter {
                store_id: Some(request.store_id),
                condition: Condition::all()
                    .add(return_product::Column::Id.eq(request.id))
                    .add(return_product::Column::Status.eq(ReturnStatus::Pending)),
            })
            .col_expr(return_product::Column::Status, Expr::value(status))
            .col_expr(return_product::Column::UpdatedAt, Expr::value(now))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::Conflict(format!(
                "Return {} was resolved concurrently",
                request.id
            )));
        }
        Ok(())
    }

    async fn record_resolution(
        &self,
        request: &return_product::Model,
        action: &str,
        reason: Option<&str>,
        actor: Uuid,
    ) {
        self.audit
            .record_best_effort(AuditEntry {
                actor_id: actor,
                action: action.into(),
                entity: "ReturnProduct".into(),
                record_id: request.id.to_string(),
                before_value: None,
                after_value: None,
                store_id: Some(request.store_id),
                metadata: reason.map(str::to_string),
            })
            .await;
    }
}
