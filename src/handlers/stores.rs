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
    entities::store,
    errors::ServiceError,
    services::stores::CreateStoreInput,
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct StoreSummary {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<store::Model> for StoreSummary {
    fn from(model: store::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            name: model.name,
            status: model.status.to_value(),
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStoreRequest {
    #[validate(length(min = 2, max = 16, message = "Code must be 2-16 characters"))]
    pub code: String,
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
}

pub async fn list_stores(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<StoreSummary>> {
    user.require(Permission::StoresRead)?;
    let stores = state.services.stores.list_stores().await?;
    Ok(Json(ApiResponse::success(
        stores.into_iter().map(StoreSummary::from).collect(),
    )))
}

pub async fn get_store(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StoreSummary> {
    user.require(Permission::StoresRead)?;
    let found = state.services.stores.get_store(id).await?;
    Ok(Json(ApiResponse::success(StoreSummary::from(found))))
}

pub async fn create_store(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateStoreRequest>,
) -> ApiResult<StoreSummary> {
    user.require(Permission::StoresManage)?;
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let created = state
        .services
        .stores
        .create_store(
            CreateStoreInput {
                code: payload.code,
                name: payload.name,
            },
            user.user_id,
        )
        .await?;
    Ok(Json(ApiResponse::success(StoreSummary::from(created))))
}
