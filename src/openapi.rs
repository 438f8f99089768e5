//! OpenAPI document for the HTTP surface.
//!
//! Schemas only; the document is served as JSON at `/api-docs/openapi.json`.

use utoipa::OpenApi;

use crate::errors::ErrorResponse;
use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sakinah API",
        description = "Multi-tenant point-of-sale and inventory backend: stores, \
warehouse distribution batches, returns, receivables and notifications. All \
endpoints except login require a Bearer JWT; tenant scoping is derived from \
the token's store binding."
    ),
    components(schemas(
        ErrorResponse,
        handlers::auth::LoginRequest,
        handlers::auth::LoginResponse,
        handlers::stores::StoreSummary,
        handlers::stores::CreateStoreRequest,
        handlers::distributions::DistributionItemRequest,
        handlers::distributions::CreateDistributionRequest,
        handlers::distributions::RejectRequest,
        handlers::distributions::DistributionLine,
        handlers::distributions::BatchResponse,
        handlers::distributions::ResolutionResponse,
        handlers::distributions::ItemResolutionResponse,
        handlers::returns::ReturnSummary,
        handlers::returns::CreateReturnRequest,
        handlers::returns::RejectReturnRequest,
        handlers::receivables::ReceivableSummary,
        handlers::receivables::RecordPaymentRequest,
        handlers::notifications::UnreadCountResponse,
    ))
)]
pub struct ApiDoc;

pub fn openapi_json() -> serde_json::Value {
    serde_json::to_value(ApiDoc::openapi()).unwrap_or_default()
}
