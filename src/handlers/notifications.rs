use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::{AuthUser, Permission},
    errors::ServiceError,
    events,
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UnreadCountQuery {
    /// Only honored for callers without a store binding (admin, warehouse).
    pub store_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub store_id: Uuid,
    pub unread: i64,
}

pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UnreadCountQuery>,
) -> ApiResult<UnreadCountResponse> {
    user.require(Permission::NotificationsRead)?;

    let store_id = match user.store_id.or(query.store_id) {
        Some(id) => id,
        None => {
            return Err(ServiceError::ValidationError(
                "store_id is required for unscoped callers".into(),
            ))
        }
    };

    let unread = events::unread_count(state.cache.as_ref(), store_id).await;
    Ok(Json(ApiResponse::success(UnreadCountResponse {
        store_id,
        unread,
    })))
}
