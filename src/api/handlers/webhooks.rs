//! Provider webhook handlers.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{PaypayNotification, WebhookAck};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};
use crate::provider::ChargeState;

/// `POST /webhooks/paypay`: Provider transaction notification.
///
/// Delivery is at-least-once; repeated notifications are no-ops. Unknown
/// references and non-final states are acknowledged without effect.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for payloads without a
/// reference or state, and a 5xx error when the row cannot be written so
/// the provider redelivers.
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/paypay",
    tag = "Webhooks",
    summary = "PayPay transaction notification",
    description = "Applies a COMPLETED, FAILED, CANCELED or EXPIRED notification to the payment row identified by `merchant_payment_id`. The raw payload is kept on the row.",
    request_body = PaypayNotification,
    responses(
        (status = 200, description = "Notification acknowledged", body = WebhookAck),
        (status = 400, description = "Malformed payload", body = ErrorResponse),
    )
)]
pub async fn paypay_webhook(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<impl IntoResponse, GatewayError> {
    let notification: PaypayNotification = serde_json::from_value(payload.clone())
        .map_err(|e| GatewayError::InvalidRequest(format!("malformed notification: {e}")))?;
    let reference = notification.merchant_payment_id.as_str();

    let Some(outcome) = ChargeState::from_provider(&notification.state).outcome() else {
        tracing::info!(
            reference,
            state = %notification.state,
            "non-final provider notification ignored"
        );
        return Ok(Json(WebhookAck {
            received: true,
            applied: false,
        }));
    };

    let transition = state
        .status_machine
        .apply_provider_notification(reference, outcome, Some(payload))
        .await?;
    Ok(Json(WebhookAck {
        received: true,
        applied: transition.is_some_and(|t| !t.is_noop()),
    }))
}

/// Webhook routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/webhooks/paypay", post(paypay_webhook))
}
