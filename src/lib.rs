//! Sakinah API Library
//!
//! Multi-tenant point-of-sale and inventory backend: per-store stock,
//! warehouse distribution batches, returns and receivables, with tenant
//! isolation enforced at the persistence layer.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod rate_limiter;
pub mod services;
pub mod tenant;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::AuthService;
use crate::cache::CacheBackend;
use crate::db::DbPool;
use crate::rate_limiter::AttemptThrottle;

/// Shared application state: one copy constructed at startup, cloned into
/// every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: services::AppServices,
    pub cache: Arc<dyn CacheBackend>,
    pub auth: Arc<AuthService>,
    pub throttle: AttemptThrottle,
}

/// Standard success envelope.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Versioned API surface. Authentication and permission checks live in the
/// handlers; tenant scoping is derived from the verified claims, never from
/// request parameters.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .route("/auth/login", post(handlers::auth::login))
        .route(
            "/stores",
            get(handlers::stores::list_stores).post(handlers::stores::create_store),
        )
        .route("/stores/:id", get(handlers::stores::get_store))
        .route(
            "/distributions",
            post(handlers::distributions::create_distribution),
        )
        .route(
            "/distributions/:id/batch",
            get(handlers::distributions::get_batch),
        )
        .route(
            "/distributions/:id/batch/accept",
            post(handlers::distributions::accept_batch),
        )
        .route(
            "/distributions/:id/batch/reject",
            post(handlers::distributions::reject_batch),
        )
        .route(
            "/distributions/:id/accept",
            post(handlers::distributions::accept_item),
        )
        .route(
            "/distributions/:id/reject",
            post(handlers::distributions::reject_item),
        )
        .route(
            "/returns",
            get(handlers::returns::list_returns).post(handlers::returns::create_return),
        )
        .route(
            "/returns/:id/approve",
            post(handlers::returns::approve_return),
        )
        .route(
            "/returns/:id/reject",
            post(handlers::returns::reject_return),
        )
        .route(
            "/receivables",
            get(handlers::receivables::list_receivables),
        )
        .route(
            "/receivables/:id",
            get(handlers::receivables::get_receivable),
        )
        .route(
            "/receivables/:id/payments",
            post(handlers::receivables::record_payment),
        )
        .route(
            "/notifications/unread-count",
            get(handlers::notifications::unread_count),
        )
}

async fn api_status() -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "service": "sakinah-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };
    let cache_status = match state.cache.get("health:probe").await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": if db_status == "healthy" { "healthy" } else { "unhealthy" },
        "checks": {
            "database": db_status,
            "cache": cache_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(health_data)))
}

/// Request logging middleware applied around the whole router.
pub async fn request_logging_middleware(
    request: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    tracing::info!(method = %method, uri = %uri, "Incoming request");

    let response = next.run(request).await;

    let duration = start.elapsed();
    tracing::info!(
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        elapsed_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}
