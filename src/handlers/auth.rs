use axum::{extract::State, http::HeaderMap, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{errors::ServiceError, ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username cannot be empty"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    pub store_id: Option<Uuid>,
    pub role: String,
}

fn client_ip(headers: &HeaderMap) -> &str {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .unwrap_or("unknown")
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let throttle_key = format!("login:{}:{}", payload.username, client_ip(&headers));
    state.throttle.check(&throttle_key).await?;

    let token = state
        .auth
        .login(&payload.username, &payload.password)
        .await?;
    state.throttle.reset(&throttle_key).await;

    let claims = state.auth.verify_token(&token)?;
    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        user_id: claims.sub,
        store_id: claims.store_id,
        role: format!("{:?}", claims.role),
    })))
}
