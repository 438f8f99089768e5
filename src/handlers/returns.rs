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
    entities::return_product,
    errors::ServiceError,
    services::returns::CreateReturnInput,
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct ReturnSummary {
    pub id: Uuid,
    pub store_id: Uuid,
    pub transaction_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub reason: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<return_product::Model> for ReturnSummary {
    fn from(model: return_product::Model) -> Self {
        Self {
            id: model.id,
            store_id: model.store_id,
            transaction_id: model.transaction_id,
            product_id: model.product_id,
            quantity: model.quantity,
            reason: model.reason,
            status: model.status.to_value(),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReturnRequest {
    pub transaction_id: Uuid,
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    #[validate(length(min = 1, message = "Reason cannot be empty"))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RejectReturnRequest {
    #[validate(length(min = 1, message = "Reason cannot be empty"))]
    pub reason: String,
}

pub async fn list_returns(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<ReturnSummary>> {
    user.require(Permission::ReturnsRead)?;
    let records = state.services.returns.list_returns(&user.scope()).await?;
    Ok(Json(ApiResponse::success(
        records.into_iter().map(ReturnSummary::from).collect(),
    )))
}

pub async fn create_return(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateReturnRequest>,
) -> ApiResult<ReturnSummary> {
    user.require(Permission::ReturnsCreate)?;
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let created = state
        .services
        .returns
        .create_return(
            &user.scope(),
            CreateReturnInput {
                transaction_id: payload.transaction_id,
                product_id: payload.product_id,
                quantity: payload.quantity,
                reason: payload.reason,
            },
            user.user_id,
        )
        .await?;
    Ok(Json(ApiResponse::success(ReturnSummary::from(created))))
}

pub async fn approve_return(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<ReturnSummary> {
    user.require(Permission::ReturnsResolve)?;
    let updated = state
        .services
        .returns
        .approve_return(&user.scope(), id, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(ReturnSummary::from(updated))))
}

pub async fn reject_return(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectReturnRequest>,
) -> ApiResult<ReturnSummary> {
    user.require(Permission::ReturnsResolve)?;
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let updated = state
        .services
        .returns
        .reject_return(&user.scope(), id, &payload.reason, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(ReturnSummary::from(updated))))
}
