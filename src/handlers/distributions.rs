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
    entities::warehouse_distribution,
    errors::ServiceError,
    services::distributions::{
        BatchItem, BatchResolution, BatchView, CreateDistributionInput, DistributionItemInput,
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DistributionItemRequest {
    pub product_id: Uuid,
    /// Must be positive; enforced together with stock checks.
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDistributionRequest {
    pub store_id: Uuid,
    #[validate(length(min = 1, message = "Invoice number cannot be empty"))]
    pub invoice_number: String,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<DistributionItemRequest>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RejectRequest {
    #[validate(length(min = 1, message = "Reason cannot be empty"))]
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DistributionLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub quantity: i32,
    pub total_amount: i64,
    pub status: String,
    pub notes: Option<String>,
    pub distributed_at: DateTime<Utc>,
}

impl From<BatchItem> for DistributionLine {
    fn from(item: BatchItem) -> Self {
        Self {
            id: item.distribution.id,
            product_id: item.distribution.product_id,
            product_name: item.product_name,
            sku: item.sku,
            quantity: item.distribution.quantity,
            total_amount: item.distribution.total_amount,
            status: item.distribution.status.to_value(),
            notes: item.distribution.notes,
            distributed_at: item.distribution.distributed_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResponse {
    pub batch_id: Uuid,
    pub invoice_number: String,
    pub store_id: Uuid,
    pub item_count: usize,
    pub total_quantity: i64,
    pub total_amount: i64,
    pub items: Vec<DistributionLine>,
}

impl From<BatchView> for BatchResponse {
    fn from(view: BatchView) -> Self {
        Self {
            batch_id: view.batch_id,
            invoice_number: view.invoice_number,
            store_id: view.store_id,
            item_count: view.item_count,
            total_quantity: view.total_quantity,
            total_amount: view.total_amount,
            items: view.items.into_iter().map(DistributionLine::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResolutionResponse {
    pub batch_id: Uuid,
    pub status: String,
    pub affected: u64,
}

impl From<BatchResolution> for ResolutionResponse {
    fn from(resolution: BatchResolution) -> Self {
        Self {
            batch_id: resolution.batch_id,
            status: resolution.status.to_value(),
            affected: resolution.affected,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemResolutionResponse {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub status: String,
    pub notes: Option<String>,
}

impl From<warehouse_distribution::Model> for ItemResolutionResponse {
    fn from(model: warehouse_distribution::Model) -> Self {
        Self {
            id: model.id,
            batch_id: model.batch_id,
            status: model.status.to_value(),
            notes: model.notes,
        }
    }
}

pub async fn create_distribution(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateDistributionRequest>,
) -> ApiResult<BatchResponse> {
    user.require(Permission::DistributionsCreate)?;
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let input = CreateDistributionInput {
        store_id: payload.store_id,
        invoice_number: payload.invoice_number,
        items: payload
            .items
            .into_iter()
            .map(|item| DistributionItemInput {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect(),
        notes: payload.notes,
    };

    let view = state
        .services
        .distributions
        .create_batch(&user.scope(), input, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(BatchResponse::from(view))))
}

pub async fn get_batch(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<BatchResponse> {
    user.require(Permission::DistributionsRead)?;
    let view = state
        .services
        .distributions
        .get_batch(&user.scope(), id)
        .await?;
    Ok(Json(ApiResponse::success(BatchResponse::from(view))))
}

pub async fn accept_batch(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<ResolutionResponse> {
    user.require(Permission::DistributionsResolve)?;
    let resolution = state
        .services
        .distributions
        .accept_batch(&user.scope(), id, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(ResolutionResponse::from(
        resolution,
    ))))
}

pub async fn reject_batch(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> ApiResult<ResolutionResponse> {
    user.require(Permission::DistributionsResolve)?;
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let resolution = state
        .services
        .distributions
        .reject_batch(&user.scope(), id, &payload.reason, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(ResolutionResponse::from(
        resolution,
    ))))
}

pub async fn accept_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<ItemResolutionResponse> {
    user.require(Permission::DistributionsResolve)?;
    let updated = state
        .services
        .distributions
        .accept_item(&user.scope(), id, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(ItemResolutionResponse::from(
        updated,
    ))))
}

pub async fn reject_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> ApiResult<ItemResolutionResponse> {
    user.require(Permission::DistributionsResolve)?;
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let updated = state
        .services
        .distributions
        .reject_item(&user.scope(), id, &payload.reason, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(ItemResolutionResponse::from(
        updated,
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_requires_at_least_one_item() {
        let payload = CreateDistributionRequest {
            store_id: Uuid::new_v4(),
            invoice_number: "INV-010".into(),
            items: vec![],
            notes: None,
        };
        assert!(payload.validate().is_err());

        let payload = CreateDistributionRequest {
            store_id: Uuid::new_v4(),
            invoice_number: "INV-010".into(),
            items: vec![DistributionItemRequest {
                product_id: Uuid::new_v4(),
                quantity: 2,
            }],
            notes: None,
        };
        assert!(payload.validate().is_ok());
    }
}
