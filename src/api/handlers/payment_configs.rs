//! Organizer payment configuration handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::api::dto::{PaymentConfigRequest, PaymentConfigResponse};
use crate::api::extract::CurrentOrganizer;
use crate::app_state::AppState;
use crate::domain::PaymentConfigId;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /payment-configs`: List the organizer's payment configurations.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthorized`] without organizer identity.
#[utoipa::path(
    get,
    path = "/api/v1/payment-configs",
    tag = "Payment Configs",
    summary = "List payment configs",
    description = "Returns the caller's configurations, oldest first. Provider secrets are never returned.",
    responses(
        (status = 200, description = "Configuration list", body = Vec<PaymentConfigResponse>),
        (status = 401, description = "Missing organizer identity", body = ErrorResponse),
    )
)]
pub async fn list_configs(
    State(state): State<AppState>,
    CurrentOrganizer(organizer): CurrentOrganizer,
) -> Result<impl IntoResponse, GatewayError> {
    let configs = state.organizers.list_configs(&organizer).await?;
    let body: Vec<PaymentConfigResponse> =
        configs.iter().map(PaymentConfigResponse::from).collect();
    Ok(Json(body))
}

/// `POST /payment-configs`: Create a payment configuration.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] when the settings do not fit
/// the method.
#[utoipa::path(
    post,
    path = "/api/v1/payment-configs",
    tag = "Payment Configs",
    summary = "Create payment config",
    request_body = PaymentConfigRequest,
    responses(
        (status = 201, description = "Configuration created", body = PaymentConfigResponse),
        (status = 400, description = "Invalid configuration", body = ErrorResponse),
    )
)]
pub async fn create_config(
    State(state): State<AppState>,
    CurrentOrganizer(organizer): CurrentOrganizer,
    Json(req): Json<PaymentConfigRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let settings = req.settings()?;
    let config = state
        .organizers
        .create_config(&organizer, req.payment_method, req.name, settings)
        .await?;
    Ok((StatusCode::CREATED, Json(PaymentConfigResponse::from(&config))))
}

/// `PUT /payment-configs/{id}`: Update a payment configuration.
///
/// A blank or absent provider secret keeps the stored one.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] when the settings do not fit
/// the method and [`GatewayError::PaymentConfigNotFound`] for unknown or
/// foreign configurations.
#[utoipa::path(
    put,
    path = "/api/v1/payment-configs/{id}",
    tag = "Payment Configs",
    summary = "Update payment config",
    params(("id" = PaymentConfigId, Path, description = "Configuration identifier")),
    request_body = PaymentConfigRequest,
    responses(
        (status = 200, description = "Updated configuration", body = PaymentConfigResponse),
        (status = 400, description = "Invalid configuration", body = ErrorResponse),
        (status = 404, description = "Configuration not found", body = ErrorResponse),
    )
)]
pub async fn update_config(
    State(state): State<AppState>,
    CurrentOrganizer(organizer): CurrentOrganizer,
    Path(id): Path<PaymentConfigId>,
    Json(req): Json<PaymentConfigRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let settings = req.settings()?;
    let config = state
        .organizers
        .update_config(&organizer, id, req.payment_method, req.name, settings)
        .await?;
    Ok(Json(PaymentConfigResponse::from(&config)))
}

/// `DELETE /payment-configs/{id}`: Delete a payment configuration.
///
/// # Errors
///
/// Returns [`GatewayError::PaymentConfigNotFound`] for unknown or foreign
/// configurations.
#[utoipa::path(
    delete,
    path = "/api/v1/payment-configs/{id}",
    tag = "Payment Configs",
    summary = "Delete payment config",
    params(("id" = PaymentConfigId, Path, description = "Configuration identifier")),
    responses(
        (status = 204, description = "Configuration deleted"),
        (status = 404, description = "Configuration not found", body = ErrorResponse),
    )
)]
pub async fn delete_config(
    State(state): State<AppState>,
    CurrentOrganizer(organizer): CurrentOrganizer,
    Path(id): Path<PaymentConfigId>,
) -> Result<impl IntoResponse, GatewayError> {
    state.organizers.delete_config(&organizer, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Payment configuration routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payment-configs", get(list_configs).post(create_config))
        .route("/payment-configs/{id}", put(update_config).delete(delete_config))
}
