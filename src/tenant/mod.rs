//! Tenant scoping middleware.
//!
//! Every operation against the allow-listed entities is funneled through a
//! [`TenantScope`], which forces the bound store id into the operation's
//! filter (read/update/delete) or payload (create/upsert). Application code
//! therefore cannot accidentally cross tenant boundaries: a caller-supplied
//! store filter is replaced, not merged. The allow-list is the set of
//! [`TenantEntity`] implementations; entities outside it (stores, users,
//! audit logs) are deliberately not scopeable.
//!
//! An unbound scope is a pass-through escape hatch for privileged/global
//! operations (warehouse staff creating distributions for a destination
//! store, admin reporting). Every pass-through logs a warning so the escape
//! hatch stays visible in production logs.

use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, DeleteMany, EntityTrait, QueryFilter,
    Select, Value,
};
use tracing::warn;
use uuid::Uuid;

use crate::entities::{product, receivable, return_product, warehouse_distribution};

/// Marker trait for entities that carry a tenant (`store_id`) column.
///
/// Implementing this trait is what puts an entity on the scoping allow-list.
pub trait TenantEntity: EntityTrait {
    fn store_id_column() -> Self::Column;
}

impl TenantEntity for product::Entity {
    fn store_id_column() -> Self::Column {
        product::Column::StoreId
    }
}

impl TenantEntity for warehouse_distribution::Entity {
    fn store_id_column() -> Self::Column {
        warehouse_distribution::Column::StoreId
    }
}

impl TenantEntity for return_product::Entity {
    fn store_id_column() -> Self::Column {
        return_product::Column::StoreId
    }
}

impl TenantEntity for receivable::Entity {
    fn store_id_column() -> Self::Column {
        receivable::Column::StoreId
    }
}

/// Caller-side operation filter. The `store_id` field is advisory: a bound
/// scope replaces it unconditionally, an unbound scope passes it through.
#[derive(Debug, Clone)]
pub struct StoreFilter {
    pub store_id: Option<Uuid>,
    pub condition: Condition,
}

impl Default for StoreFilter {
    fn default() -> Self {
        Self {
            store_id: None,
            condition: Condition::all(),
        }
    }
}

impl StoreFilter {
    pub fn for_store(store_id: Uuid) -> Self {
        Self {
            store_id: Some(store_id),
            ..Default::default()
        }
    }

    pub fn with_condition(condition: Condition) -> Self {
        Self {
            store_id: None,
            condition,
        }
    }
}

/// A tenant scope bound (or not) to one store, constructed once per request
/// from the caller's claims and threaded through every persistence call.
#[derive(Debug, Clone, Default)]
pub struct TenantScope {
    store_id: Option<Uuid>,
}

impl TenantScope {
    pub fn for_store(store_id: Uuid) -> Self {
        Self {
            store_id: Some(store_id),
        }
    }

    /// Privileged pass-through scope. Operations run unscoped and each one
    /// logs a warning.
    pub fn unbound() -> Self {
        Self { store_id: None }
    }

    pub fn store_id(&self) -> Option<Uuid> {
        self.store_id
    }

    pub fn is_bound(&self) -> bool {
        self.store_id.is_some()
    }

    /// Resolves the effective filter condition for an operation: the bound
    /// store id replaces any caller-supplied one, then the caller's remaining
    /// predicates are appended.
    pub fn filter<E: TenantEntity>(&self, caller: StoreFilter) -> Condition {
        let entity = E::default().table_name().to_owned();
        match self.store_id {
            Some(bound) => {
                if let Some(requested) = caller.store_id {
                    if requested != bound {
                        warn!(
                            %entity,
                            %bound,
                            %requested,
                            "caller-supplied store filter conflicts with tenant scope; replaced"
                        );
                    }
                }
                Condition::all()
                    .add(E::store_id_column().eq(bound))
                    .add(caller.condition)
            }
            None => {
                warn!(%entity, "tenant scope unbound; operation passes through unscoped");
                match caller.store_id {
                    Some(requested) => Condition::all()
                        .add(E::store_id_column().eq(requested))
                        .add(caller.condition),
                    None => caller.condition,
                }
            }
        }
    }

    /// Read-family entry point: a `SELECT` whose predicate carries the tenant
    /// filter.
    pub fn select<E: TenantEntity>(&self, caller: StoreFilter) -> Select<E> {
        E::find().filter(self.filter::<E>(caller))
    }

    /// Update-family entry point. Callers append `col_expr` assignments; the
    /// tenant predicate is already in place.
    pub fn update_many<E: TenantEntity>(&self, caller: StoreFilter) -> sea_orm::UpdateMany<E> {
        E::update_many().filter(self.filter::<E>(caller))
    }

    /// Delete-family entry point.
    pub fn delete_many<E: TenantEntity>(&self, caller: StoreFilter) -> DeleteMany<E> {
        E::delete_many().filter(self.filter::<E>(caller))
    }

    /// Create-family entry point: stamps the payload's store id with the
    /// bound value, overwriting whatever the caller set. Unbound scopes leave
    /// the payload untouched (logged).
    pub fn stamp<E, A>(&self, mut model: A) -> A
    where
        E: TenantEntity,
        A: ActiveModelTrait<Entity = E>,
    {
        let entity = E::default().table_name().to_owned();
        match self.store_id {
            Some(bound) => {
                let bound_value: Value = bound.into();
                match model.get(E::store_id_column()) {
                    ActiveValue::Set(existing) | ActiveValue::Unchanged(existing)
                        if existing != bound_value =>
                    {
                        warn!(
                            %entity,
                            %bound,
                            "caller-supplied store id in create payload conflicts with tenant scope; replaced"
                        );
                    }
                    _ => {}
                }
                model.set(E::store_id_column(), bound_value);
                model
            }
            None => {
                warn!(%entity, "tenant scope unbound; create payload passes through unstamped");
                model
            }
        }
    }

    /// Upsert entry point: stamps filter, insert payload and update payload
    /// in one call, so no leg of the upsert can escape the tenant.
    pub fn stamp_upsert<E, A>(
        &self,
        caller: StoreFilter,
        insert: A,
        update: A,
    ) -> (Condition, A, A)
    where
        E: TenantEntity,
        A: ActiveModelTrait<Entity = E>,
    {
        (
            self.filter::<E>(caller),
            self.stamp::<E, A>(insert),
            self.stamp::<E, A>(update),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::product;
    use sea_orm::{DbBackend, QueryTrait, Set};

    fn sql_of(select: Select<product::Entity>) -> String {
        select.build(DbBackend::Sqlite).to_string()
    }

    #[test]
    fn bound_scope_injects_store_predicate() {
        let store = Uuid::new_v4();
        let scope = TenantScope::for_store(store);

        let sql = sql_of(scope.select::<product::Entity>(StoreFilter::default()));
        assert!(sql.contains(&store.to_string()));
    }

    #[test]
    fn conflicting_caller_store_filter_is_replaced() {
        let bound = Uuid::new_v4();
        let other = Uuid::new_v4();
        let scope = TenantScope::for_store(bound);

        let sql = sql_of(scope.select::<product::Entity>(StoreFilter::for_store(other)));
        assert!(sql.contains(&bound.to_string()));
        assert!(!sql.contains(&other.to_string()));
    }

    #[test]
    fn unbound_scope_passes_caller_filter_through() {
        let requested = Uuid::new_v4();
        let scope = TenantScope::unbound();

        let sql = sql_of(scope.select::<product::Entity>(StoreFilter::for_store(requested)));
        assert!(sql.contains(&requested.to_string()));

        let sql = sql_of(scope.select::<product::Entity>(StoreFilter::default()));
        assert!(!sql.contains("store_id"));
    }

    #[test]
    fn upsert_stamps_filter_and_both_payloads() {
        let bound = Uuid::new_v4();
        let other = Uuid::new_v4();
        let scope = TenantScope::for_store(bound);

        let now = chrono::Utc::now();
        let payload = |store_id: Uuid| product::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            sku: Set("SKU-3".into()),
            name: Set("Kebaya".into()),
            category: Set("dresses".into()),
            price: Set(200_000),
            quantity: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let (filter, insert, update) = scope.stamp_upsert::<product::Entity, _>(
            StoreFilter::for_store(other),
            payload(other),
            payload(other),
        );

        let sql = sql_of(product::Entity::find().filter(filter));
        assert!(sql.contains(&bound.to_string()));
        assert!(!sql.contains(&other.to_string()));
        assert_eq!(insert.store_id, Set(bound));
        assert_eq!(update.store_id, Set(bound));
    }

    #[test]
    fn stamp_overwrites_caller_store_id() {
        let bound = Uuid::new_v4();
        let other = Uuid::new_v4();
        let scope = TenantScope::for_store(bound);

        let now = chrono::Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(other),
            sku: Set("SKU-1".into()),
            name: Set("Batik Shirt".into()),
            category: Set("shirts".into()),
            price: Set(150_000),
            quantity: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let stamped = scope.stamp::<product::Entity, _>(model);
        assert_eq!(stamped.store_id, Set(bound));
    }

    #[test]
    fn unbound_stamp_is_a_no_op() {
        let other = Uuid::new_v4();
        let scope = TenantScope::unbound();

        let now = chrono::Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(other),
            sku: Set("SKU-2".into()),
            name: Set("Sarong".into()),
            category: Set("fabric".into()),
            price: Set(90_000),
            quantity: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let stamped = scope.stamp::<product::Entity, _>(model);
        assert_eq!(stamped.store_id, Set(other));
    }
}
