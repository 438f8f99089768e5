use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::store::{self, StoreStatus, WAREHOUSE_MASTER_CODE};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::{AuditEntry, AuditService};

#[derive(Debug, Clone)]
pub struct CreateStoreInput {
    pub code: String,
    pub name: String,
}

#[derive(Clone)]
pub struct StoreService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    audit: Arc<AuditService>,
}

impl StoreService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, audit: Arc<AuditService>) -> Self {
        Self {
            db,
            event_sender,
            audit,
        }
    }

    #[instrument(skip(self))]
    pub async fn create_store(
        &self,
        input: CreateStoreInput,
        actor: Uuid,
    ) -> Result<store::Model, ServiceError> {
        let code = input.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(ServiceError::ValidationError("Store code cannot be empty".into()));
        }
        if code == WAREHOUSE_MASTER_CODE {
            return Err(ServiceError::ValidationError(
                "Store code is reserved for the central warehouse".into(),
            ));
        }

        let now = Utc::now();
        let model = store::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            name: Set(input.name.trim().to_string()),
            status: Set(StoreStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model
            .insert(&*self.db)
            .await
            .map_err(|e| ServiceError::from_unique_violation(e, "Store code already in use"))?;

        info!(store_id = %created.id, code = %created.code, "store created");

        self.audit
            .record_best_effort(AuditEntry {
                actor_id: actor,
                action: "store.create".into(),
                entity: "Store".into(),
                record_id: created.id.to_string(),
                before_value: None,
                after_value: serde_json::to_value(&created).ok(),
                store_id: Some(created.id),
                metadata: None,
            })
            .await;
        self.event_sender
            .send(Event::StoreCreated {
                store_id: created.id,
            })
            .await;

        Ok(created)
    }

    /// Lists tenant stores; the SYSTEM warehouse master never appears here.
    pub async fn list_stores(&self) -> Result<Vec<store::Model>, ServiceError> {
        store::Entity::find()
            .filter(store::Column::Status.eq(StoreStatus::Active))
            .order_by_asc(store::Column::Code)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    pub async fn get_store(&self, id: Uuid) -> Result<store::Model, ServiceError> {
        store::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Store {} not found", id)))
    }

    /// The reserved SYSTEM store acting as the virtual tenant for central
    /// inventory. Seeded by migration, so absence is an internal error.
    pub async fn warehouse_master(&self) -> Result<store::Model, ServiceError> {
        store::Entity::find()
            .filter(store::Column::Code.eq(WAREHOUSE_MASTER_CODE))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::InternalError("Warehouse master store is missing".into())
            })
    }
}
