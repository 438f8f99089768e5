//! Warehouse distribution batches.
//!
//! A shipment from the central warehouse to a store is persisted as N line
//! rows sharing one generated `batch_id`. The batch is a logical grouping
//! only; its aggregate state (counts, totals) is recomputed from the member
//! rows on every fetch. Accept/reject operates either on the whole batch or
//! on a single line, always inside one transaction, and eligibility
//! (`PENDING_ACCEPTANCE`) is re-checked in each UPDATE's own predicate so a
//! concurrent resolution cannot be silently overwritten.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::store::{self, StoreStatus};
use crate::entities::warehouse_distribution::{self, DistributionStatus};
use crate::entities::{product, warehouse_product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::{AuditEntry, AuditService};
use crate::tenant::{StoreFilter, TenantScope};

#[derive(Debug, Clone)]
pub struct DistributionItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CreateDistributionInput {
    pub store_id: Uuid,
    pub invoice_number: String,
    pub items: Vec<DistributionItemInput>,
    pub notes: Option<String>,
}

/// One line of a batch, joined with its warehouse product for display.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    #[serde(flatten)]
    pub distribution: warehouse_distribution::Model,
    pub product_name: String,
    pub sku: String,
}

/// Batch view assembled from the member rows; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct BatchView {
    pub batch_id: Uuid,
    pub invoice_number: String,
    pub store_id: Uuid,
    pub item_count: usize,
    pub total_quantity: i64,
    pub total_amount: i64,
    pub items: Vec<BatchItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResolution {
    pub batch_id: Uuid,
    pub status: DistributionStatus,
    pub affected: u64,
}

#[derive(Clone)]
pub struct DistributionService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    audit: Arc<AuditService>,
}

impl DistributionService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, audit: Arc<AuditService>) -> Self {
        Self {
            db,
            event_sender,
            audit,
        }
    }

    /// Creates a shipment: all lines inserted under one generated batch id,
    /// warehouse stock decremented per line. Any failure rolls the whole
    /// batch back.
    #[instrument(skip(self, scope, input), fields(store_id = %input.store_id, items = input.items.len()))]
    pub async fn create_batch(
        &self,
        scope: &TenantScope,
        input: CreateDistributionInput,
        actor: Uuid,
    ) -> Result<BatchView, ServiceError> {
        let invoice_number = input.invoice_number.trim().to_string();
        if invoice_number.is_empty() {
            return Err(ServiceError::ValidationError(
                "Invoice number cannot be empty".into(),
            ));
        }
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "A distribution needs at least one item".into(),
            ));
        }
        if input.items.iter().any(|item| item.quantity <= 0) {
            return Err(ServiceError::ValidationError(
                "Item quantities must be positive".into(),
            ));
        }

        let destination = store::Entity::find_by_id(input.store_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Store {} not found", input.store_id))
            })?;
        if destination.status != StoreStatus::Active {
            return Err(ServiceError::InvalidOperation(
                "Cannot distribute to an inactive or system store".into(),
            ));
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let batch_id = Uuid::new_v4();
        let now = Utc::now();
        let mut lines = Vec::with_capacity(input.items.len());

        for item in &input.items {
            let source = warehouse_product::Entity::find_by_id(item.product_id)
                .one(&txn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Warehouse product {} not found",
                        item.product_id
                    ))
                })?;

            // Stock is re-checked in the UPDATE predicate; a concurrent
            // shipment draining the row fails this one instead of going
            // negative.
            let debit = warehouse_product::Entity::update_many()
                .col_expr(
                    warehouse_product::Column::Quantity,
                    Expr::col(warehouse_product::Column::Quantity).sub(item.quantity),
                )
                .col_expr(warehouse_product::Column::UpdatedAt, Expr::value(now))
                .filter(warehouse_product::Column::Id.eq(item.product_id))
                .filter(warehouse_product::Column::Quantity.gte(item.quantity))
                .exec(&txn)
                .await
                .map_err(ServiceError::db_error)?;
            if debit.rows_affected == 0 {
                return Err(ServiceError::InsufficientStock(format!(
                    "Not enough warehouse stock for {} (requested {}, available {})",
                    source.sku, item.quantity, source.quantity
                )));
            }

            let line = scope.stamp::<warehouse_distribution::Entity, _>(
                warehouse_distribution::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    store_id: Set(destination.id),
                    warehouse_id: Set(source.warehouse_store_id),
                    product_id: Set(source.id),
                    batch_id: Set(batch_id),
                    invoice_number: Set(invoice_number.clone()),
                    quantity: Set(item.quantity),
                    total_amount: Set(source.price * item.quantity as i64),
                    status: Set(DistributionStatus::PendingAcceptance),
                    distributed_at: Set(now),
                    distributed_by: Set(actor),
                    notes: Set(input.notes.clone()),
                    created_at: Set(now),
                    updated_at: Set(now),
                },
            );
            let inserted = line.insert(&txn).await.map_err(ServiceError::db_error)?;
            lines.push(BatchItem {
                distribution: inserted,
                product_name: source.name,
                sku: source.sku,
            });
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(%batch_id, store_id = %destination.id, lines = lines.len(), "distribution batch created");

        self.audit
            .record_best_effort(AuditEntry {
                actor_id: actor,
                action: "distribution.batch.create".into(),
                entity: "WarehouseDistribution".into(),
                record_id: batch_id.to_string(),
                before_value: None,
                after_value: serde_json::to_value(&lines).ok(),
                store_id: Some(destination.id),
                metadata: Some(invoice_number.clone()),
            })
            .await;
        self.event_sender
            .send(Event::DistributionCreated {
                batch_id,
                store_id: destination.id,
                items: lines.len(),
            })
            .await;

        Ok(assemble_view(batch_id, invoice_number, destination.id, lines))
    }

    /// Group fetch: resolves one member row, then loads every row sharing its
    /// (store_id, batch_id) with aggregates recomputed from scratch.
    #[instrument(skip(self, scope))]
    pub async fn get_batch(
        &self,
        scope: &TenantScope,
        member_id: Uuid,
    ) -> Result<BatchView, ServiceError> {
        let reference = self.find_member(scope, member_id, &*self.db).await?;

        let members = scope
            .select::<warehouse_distribution::Entity>(StoreFilter {
                store_id: Some(reference.store_id),
                condition: Condition::all()
                    .add(warehouse_distribution::Column::BatchId.eq(reference.batch_id)),
            })
            .find_also_related(warehouse_product::Entity)
            .order_by_asc(warehouse_product::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        let items = members
            .into_iter()
            .map(|(distribution, source)| {
                let (product_name, sku) = source
                    .map(|p| (p.name, p.sku))
                    .unwrap_or_else(|| ("(deleted product)".to_string(), String::new()));
                BatchItem {
                    distribution,
                    product_name,
                    sku,
                }
            })
            .collect();

        Ok(assemble_view(
            reference.batch_id,
            reference.invoice_number,
            reference.store_id,
            items,
        ))
    }

    /// Rejects every still-pending line of the batch, appending the reason to
    /// each line's notes. Zero eligible lines is NotFound, never a silent
    /// success.
    #[instrument(skip(self, scope, reason))]
    pub async fn reject_batch(
        &self,
        scope: &TenantScope,
        member_id: Uuid,
        reason: &str,
        actor: Uuid,
    ) -> Result<BatchResolution, ServiceError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::ValidationError(
                "A rejection reason is required".into(),
            ));
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let reference = self.find_member(scope, member_id, &txn).await?;
        let pending = self.pending_members(scope, &reference, &txn).await?;

        let now = Utc::now();
        let mut affected = 0;
        for row in &pending {
            let result = scope
                .update_many::<warehouse_distribution::Entity>(StoreFilter {
                    store_id: Some(reference.store_id),
                    condition: Condition::all()
                        .add(warehouse_distribution::Column::Id.eq(row.id))
                        .add(
                            warehouse_distribution::Column::Status
                                .eq(DistributionStatus::PendingAcceptance),
                        ),
                })
                .col_expr(
                    warehouse_distribution::Column::Status,
                    Expr::value(DistributionStatus::Rejected),
                )
                .col_expr(
                    warehouse_distribution::Column::Notes,
                    Expr::value(append_rejection(&row.notes, reason)),
                )
                .col_expr(warehouse_distribution::Column::UpdatedAt, Expr::value(now))
                .exec(&txn)
                .await
                .map_err(ServiceError::db_error)?;
            affected += result.rows_affected;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(batch_id = %reference.batch_id, affected, "distribution batch rejected");
        self.record_resolution(&reference, "distribution.batch.reject", Some(reason), actor)
            .await;
        self.event_sender
            .send(Event::DistributionRejected {
                batch_id: reference.batch_id,
                store_id: reference.store_id,
                affected,
            })
            .await;

        Ok(BatchResolution {
            batch_id: reference.batch_id,
            status: DistributionStatus::Rejected,
            affected,
        })
    }

    /// Accepts every still-pending line: marks it DELIVERED and credits the
    /// destination store's stock, all in one transaction.
    #[instrument(skip(self, scope))]
    pub async fn accept_batch(
        &self,
        scope: &TenantScope,
        member_id: Uuid,
        actor: Uuid,
    ) -> Result<BatchResolution, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let reference = self.find_member(scope, member_id, &txn).await?;
        let pending = self.pending_members(scope, &reference, &txn).await?;

        let now = Utc::now();
        let mut affected = 0;
        for row in &pending {
            let result = scope
                .update_many::<warehouse_distribution::Entity>(StoreFilter {
                    store_id: Some(reference.store_id),
                    condition: Condition::all()
                        .add(warehouse_distribution::Column::Id.eq(row.id))
                        .add(
                            warehouse_distribution::Column::Status
                                .eq(DistributionStatus::PendingAcceptance),
                        ),
                })
                .col_expr(
                    warehouse_distribution::Column::Status,
                    Expr::value(DistributionStatus::Delivered),
                )
                .col_expr(warehouse_distribution::Column::UpdatedAt, Expr::value(now))
                .exec(&txn)
                .await
                .map_err(ServiceError::db_error)?;
            if result.rows_affected == 1 {
                self.credit_store_stock(scope, row, &txn).await?;
                affected += 1;
            }
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(batch_id = %reference.batch_id, affected, "distribution batch accepted");
        self.record_resolution(&reference, "distribution.batch.accept", None, actor)
            .await;
        self.event_sender
            .send(Event::DistributionAccepted {
                batch_id: reference.batch_id,
                store_id: reference.store_id,
                affected,
            })
            .await;

        Ok(BatchResolution {
            batch_id: reference.batch_id,
            status: DistributionStatus::Delivered,
            affected,
        })
    }

    /// Accepts a single line. Siblings are untouched and remain independently
    /// actionable.
    #[instrument(skip(self, scope))]
    pub async fn accept_item(
        &self,
        scope: &TenantScope,
        member_id: Uuid,
        actor: Uuid,
    ) -> Result<warehouse_distribution::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let row = self.find_member(scope, member_id, &txn).await?;
        self.guard_pending(&row, "accepted")?;

        let now = Utc::now();
        self.resolve_single(scope, &row, DistributionStatus::Delivered, None, now, &txn)
            .await?;
        self.credit_store_stock(scope, &row, &txn).await?;

        let updated = self.find_member(scope, member_id, &txn).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        self.record_item_resolution(&row, "distribution.item.accept", None, actor)
            .await;
        self.event_sender
            .send(Event::DistributionItemAccepted {
                distribution_id: row.id,
                store_id: row.store_id,
            })
            .await;

        Ok(updated)
    }

    /// Rejects a single line with a reason appended to its notes.
    #[instrument(skip(self, scope, reason))]
    pub async fn reject_item(
        &self,
        scope: &TenantScope,
        member_id: Uuid,
        reason: &str,
        actor: Uuid,
    ) -> Result<warehouse_distribution::Model, ServiceError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::ValidationError(
                "A rejection reason is required".into(),
            ));
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let row = self.find_member(scope, member_id, &txn).await?;
        self.guard_pending(&row, "rejected")?;

        let now = Utc::now();
        self.resolve_single(
            scope,
            &row,
            DistributionStatus::Rejected,
            Some(append_rejection(&row.notes, reason)),
            now,
            &txn,
        )
        .await?;

        let updated = self.find_member(scope, member_id, &txn).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        self.record_item_resolution(&row, "distribution.item.reject", Some(reason), actor)
            .await;
        self.event_sender
            .send(Event::DistributionItemRejected {
                distribution_id: row.id,
                store_id: row.store_id,
            })
            .await;

        Ok(updated)
    }

    async fn find_member<C: sea_orm::ConnectionTrait>(
        &self,
        scope: &TenantScope,
        member_id: Uuid,
        conn: &C,
    ) -> Result<warehouse_distribution::Model, ServiceError> {
        scope
            .select::<warehouse_distribution::Entity>(StoreFilter::with_condition(
                Condition::all().add(warehouse_distribution::Column::Id.eq(member_id)),
            ))
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Distribution {} not found", member_id))
            })
    }

    async fn pending_members(
        &self,
        scope: &TenantScope,
        reference: &warehouse_distribution::Model,
        txn: &DatabaseTransaction,
    ) -> Result<Vec<warehouse_distribution::Model>, ServiceError> {
        let pending = scope
            .select::<warehouse_distribution::Entity>(StoreFilter {
                store_id: Some(reference.store_id),
                condition: Condition::all()
                    .add(warehouse_distribution::Column::BatchId.eq(reference.batch_id))
                    .add(
                        warehouse_distribution::Column::Status
                            .eq(DistributionStatus::PendingAcceptance),
                    ),
            })
            .all(txn)
            .await
            .map_err(ServiceError::db_error)?;
        if pending.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "Batch {} has no pending items",
                reference.batch_id
            )));
        }
        Ok(pending)
    }

    fn guard_pending(
        &self,
        row: &warehouse_distribution::Model,
        verb: &str,
    ) -> Result<(), ServiceError> {
        if row.status.is_terminal() {
            return Err(ServiceError::InvalidOperation(format!(
                "Distribution {} is {:?} and cannot be {}",
                row.id, row.status, verb
            )));
        }
        Ok(())
    }

    /// Conditional single-row transition. The pending check in the predicate
    /// turns a concurrent resolution into a Conflict instead of a lost update.
    async fn resolve_single(
        &self,
        scope: &TenantScope,
        row: &warehouse_distribution::Model,
        status: DistributionStatus,
        notes: Option<String>,
        now: chrono::DateTime<Utc>,
        txn: &DatabaseTransaction,
    ) -> Result<(), ServiceError> {
        let mut update = scope
            .update_many::<warehouse_distribution::Entity>(StoreFilter {
                store_id: Some(row.store_id),
                condition: Condition::all()
                    .add(warehouse_distribution::Column::Id.eq(row.id))
                    .add(
                        warehouse_distribution::Column::Status
                            .eq(DistributionStatus::PendingAcceptance),
                    ),
            })
            .col_expr(warehouse_distribution::Column::Status, Expr::value(status))
            .col_expr(warehouse_distribution::Column::UpdatedAt, Expr::value(now));
        if let Some(notes) = notes {
            update = update.col_expr(warehouse_distribution::Column::Notes, Expr::value(notes));
        }

        let result = update.exec(txn).await.map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::Conflict(format!(
                "Distribution {} was resolved concurrently",
                row.id
            )));
        }
        Ok(())
    }

    /// Upserts the destination store's product row for one accepted line and
    /// credits its quantity.
    async fn credit_store_stock(
        &self,
        scope: &TenantScope,
        row: &warehouse_distribution::Model,
        txn: &DatabaseTransaction,
    ) -> Result<(), ServiceError> {
        let source = warehouse_product::Entity::find_by_id(row.product_id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Warehouse product {} not found", row.product_id))
            })?;

        let now = Utc::now();
        let existing = scope
            .select::<product::Entity>(StoreFilter {
                store_id: Some(row.store_id),
                condition: Condition::all().add(product::Column::Sku.eq(source.sku.clone())),
            })
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?;

        match existing {
            Some(stock) => {
                scope
                    .update_many::<product::Entity>(StoreFilter {
                        store_id: Some(row.store_id),
                        condition: Condition::all().add(product::Column::Id.eq(stock.id)),
                    })
                    .col_expr(
                        product::Column::Quantity,
                        Expr::col(product::Column::Quantity).add(row.quantity),
                    )
                    .col_expr(product::Column::UpdatedAt, Expr::value(now))
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
            }
            None => {
                let fresh = scope.stamp::<product::Entity, _>(product::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    store_id: Set(row.store_id),
                    sku: Set(source.sku),
                    name: Set(source.name),
                    category: Set(source.category),
                    price: Set(source.price),
                    quantity: Set(row.quantity),
                    created_at: Set(now),
                    updated_at: Set(now),
                });
                fresh.insert(txn).await.map_err(ServiceError::db_error)?;
            }
        }
        Ok(())
    }

    async fn record_resolution(
        &self,
        reference: &warehouse_distribution::Model,
        action: &str,
        reason: Option<&str>,
        actor: Uuid,
    ) {
        self.audit
            .record_best_effort(AuditEntry {
                actor_id: actor,
                action: action.into(),
                entity: "WarehouseDistribution".into(),
                record_id: reference.batch_id.to_string(),
                before_value: None,
                after_value: None,
                store_id: Some(reference.store_id),
                metadata: reason.map(str::to_string),
            })
            .await;
    }

    async fn record_item_resolution(
        &self,
        row: &warehouse_distribution::Model,
        action: &str,
        reason: Option<&str>,
        actor: Uuid,
    ) {
        self.audit
            .record_best_effort(AuditEntry {
                actor_id: actor,
                action: action.into(),
                entity: "WarehouseDistribution".into(),
                record_id: row.id.to_string(),
                before_value: None,
                after_value: None,
                store_id: Some(row.store_id),
                metadata: reason.map(str::to_string),
            })
            .await;
    }
}

fn assemble_view(
    batch_id: Uuid,
    invoice_number: String,
    store_id: Uuid,
    items: Vec<BatchItem>,
) -> BatchView {
    let total_quantity = items
        .iter()
        .map(|i| i.distribution.quantity as i64)
        .sum();
    let total_amount = items.iter().map(|i| i.distribution.total_amount).sum();
    BatchView {
        batch_id,
        invoice_number,
        store_id,
        item_count: items.len(),
        total_quantity,
        total_amount,
        items,
    }
}

fn append_rejection(notes: &Option<String>, reason: &str) -> String {
    match notes.as_deref() {
        Some(existing) if !existing.trim().is_empty() => {
            format!("{}\nRejected: {}", existing, reason)
        }
        _ => format!("Rejected: {}", reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_reason_is_appended_to_existing_notes() {
        assert_eq!(
            append_rejection(&None, "damaged goods"),
            "Rejected: damaged goods"
        );
        assert_eq!(
            append_rejection(&Some("fragile".into()), "damaged goods"),
            "fragile\nRejected: damaged goods"
        );
        assert_eq!(
            append_rejection(&Some("  ".into()), "damaged goods"),
            "Rejected: damaged goods"
        );
    }
}
