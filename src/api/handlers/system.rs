//! System endpoints: health check, supported payment methods.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::PaymentMethod;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Supported payment method info.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentMethodInfo {
    payment_method: PaymentMethod,
    label: &'static str,
    requires_config: bool,
    creates_charge: bool,
}

/// `GET /config/payment-methods`: List supported payment methods.
#[utoipa::path(
    get,
    path = "/config/payment-methods",
    tag = "System",
    summary = "List supported payment methods",
    description = "Returns every payment method the gateway supports, whether it needs an organizer configuration and whether it creates a provider charge.",
    responses(
        (status = 200, description = "Payment method catalog", body = Vec<PaymentMethodInfo>),
    )
)]
pub async fn payment_methods_handler() -> impl IntoResponse {
    let methods: Vec<PaymentMethodInfo> = PaymentMethod::ALL
        .into_iter()
        .map(|method| PaymentMethodInfo {
            payment_method: method,
            label: method.label(),
            requires_config: method.requires_config(),
            creates_charge: method.creates_charge(),
        })
        .collect();
    (StatusCode::OK, Json(methods))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/payment-methods", get(payment_methods_handler))
}
