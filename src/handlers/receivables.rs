use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{AuthUser, Permission},
    entities::receivable,
    errors::ServiceError,
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceivableSummary {
    pub id: Uuid,
    pub store_id: Uuid,
    pub transaction_id: Uuid,
    pub customer_name: String,
    pub amount_due: i64,
    pub amount_paid: i64,
    pub remaining: i64,
    pub status: String,
    pub due_date: Option<DateTime<Utc>>,
}

impl From<receivable::Model> for ReceivableSummary {
    fn from(model: receivable::Model) -> Self {
        Self {
            id: model.id,
            store_id: model.store_id,
            transaction_id: model.transaction_id,
            customer_name: model.customer_name,
            remaining: model.amount_due - model.amount_paid,
            amount_due: model.amount_due,
            amount_paid: model.amount_paid,
            status: model.status.to_value(),
            due_date: model.due_date,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordPaymentRequest {
    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,
}

pub async fn list_receivables(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<ReceivableSummary>> {
    user.require(Permission::ReceivablesRead)?;
    let records = state
        .services
        .receivables
        .list_receivables(&user.scope())
        .await?;
    Ok(Json(ApiResponse::success(
        records.into_iter().map(ReceivableSummary::from).collect(),
    )))
}

pub async fn get_receivable(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<ReceivableSummary> {
    user.require(Permission::ReceivablesRead)?;
    let found = state
        .services
        .receivables
        .get_receivable(&user.scope(), id)
        .await?;
    Ok(Json(ApiResponse::success(ReceivableSummary::from(found))))
}

pub async fn record_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> ApiResult<ReceivableSummary> {
    user.require(Permission::ReceivablesPost)?;
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let updated = state
        .services
        .receivables
        .record_payment(&user.scope(), id, payload.amount, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(ReceivableSummary::from(updated))))
}
