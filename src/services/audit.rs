use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value as Json;
use std::sync::Arc;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::audit_log;
use crate::errors::ServiceError;

/// One append-only audit record. Batch operations produce a single entry
/// keyed by the batch id rather than one per member row.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub actor_id: Uuid,
    pub action: String,
    pub entity: String,
    pub record_id: String,
    pub before_value: Option<Json>,
    pub after_value: Option<Json>,
    pub store_id: Option<Uuid>,
    pub metadata: Option<String>,
}

#[derive(Clone)]
pub struct AuditService {
    db: Arc<DbPool>,
}

impl AuditService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Persists an audit entry. Called after the triggering transaction
    /// commits; the log is never written from inside it.
    #[instrument(skip(self, entry), fields(action = %entry.action, entity = %entry.entity))]
    pub async fn record(&self, entry: AuditEntry) -> Result<(), ServiceError> {
        let model = audit_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            actor_id: Set(entry.actor_id),
            action: Set(entry.action),
            entity: Set(entry.entity),
            record_id: Set(entry.record_id),
            before_value: Set(entry.before_value),
            after_value: Set(entry.after_value),
            store_id: Set(entry.store_id),
            metadata: Set(entry.metadata),
            created_at: Set(Utc::now()),
        };

        model
            .insert(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(())
    }

    /// Post-commit variant: the mutation already succeeded, so an audit
    /// failure must not turn the response into an error. It is logged loudly
    /// instead.
    pub async fn record_best_effort(&self, entry: AuditEntry) {
        let description = format!("{} {}", entry.action, entry.record_id);
        if let Err(e) = self.record(entry).await {
            error!(error = %e, %description, "failed to write audit entry");
        }
    }
}
