//! Organizer settings handlers.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::OrganizerSettingsDto;
use crate::api::extract::CurrentOrganizer;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /settings`: Read the organizer's settings.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthorized`] without organizer identity.
#[utoipa::path(
    get,
    path = "/api/v1/settings",
    tag = "Settings",
    summary = "Get organizer settings",
    description = "Returns the default payment configurations, dropping any that were deleted.",
    responses(
        (status = 200, description = "Current settings", body = OrganizerSettingsDto),
        (status = 401, description = "Missing organizer identity", body = ErrorResponse),
    )
)]
pub async fn get_settings(
    State(state): State<AppState>,
    CurrentOrganizer(organizer): CurrentOrganizer,
) -> Result<impl IntoResponse, GatewayError> {
    let default_payment_config_ids = state.organizers.default_payment_configs(&organizer).await?;
    Ok(Json(OrganizerSettingsDto {
        default_payment_config_ids,
    }))
}

/// `PUT /settings`: Replace the organizer's settings.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for configurations the
/// organizer does not own.
#[utoipa::path(
    put,
    path = "/api/v1/settings",
    tag = "Settings",
    summary = "Update organizer settings",
    request_body = OrganizerSettingsDto,
    responses(
        (status = 200, description = "Stored settings", body = OrganizerSettingsDto),
        (status = 400, description = "Unknown payment config", body = ErrorResponse),
    )
)]
pub async fn update_settings(
    State(state): State<AppState>,
    CurrentOrganizer(organizer): CurrentOrganizer,
    Json(req): Json<OrganizerSettingsDto>,
) -> Result<impl IntoResponse, GatewayError> {
    let updated = state
        .organizers
        .set_default_payment_configs(&organizer, req.default_payment_config_ids)
        .await?;
    Ok(Json(OrganizerSettingsDto {
        default_payment_config_ids: updated.default_payment_config_ids,
    }))
}

/// Organizer settings routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/settings", get(get_settings).put(update_settings))
}
