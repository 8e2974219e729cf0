//! Participant payment page handlers: event view, verification, submission.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    AuthRequest, AuthResponse, EventPageResponse, ParticipantPaymentParams,
    ParticipantPaymentResponse, PaymentOptionDto, PaymentStatusDto, SubmitPaymentRequest,
    SubmitPaymentResponse, VerifyParams, VerifyResponse,
};
use crate::app_state::AppState;
use crate::domain::ParticipantId;
use crate::error::{ErrorResponse, GatewayError};
use crate::service::VerificationRequest;

/// `GET /pay/{token}`: Public view of an event's payment page.
///
/// # Errors
///
/// Returns [`GatewayError::EventNotFound`] for unknown or inactive events.
#[utoipa::path(
    get,
    path = "/api/v1/pay/{token}",
    tag = "Payment Page",
    summary = "Get event payment page",
    description = "Returns the event name, date, base amount, priced conditions and the payment options the organizer enabled.",
    params(("token" = String, Path, description = "Public payment token of the event")),
    responses(
        (status = 200, description = "Event payment page", body = EventPageResponse),
        (status = 404, description = "Event not found or inactive", body = ErrorResponse),
    )
)]
pub async fn event_page(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let event = state.payments.active_event(&token).await?;
    let configs = state.payments.enabled_configs(&event).await?;

    let mut payment_options: Vec<PaymentOptionDto> =
        configs.iter().map(PaymentOptionDto::from).collect();
    if event.cash_enabled {
        payment_options.push(PaymentOptionDto::cash());
    }

    Ok(Json(EventPageResponse {
        event_id: event.id,
        name: event.name,
        date: event.date,
        base_amount: event.base_amount,
        conditions: event.conditions,
        payment_options,
    }))
}

/// `POST /pay/{token}/auth`: Start email verification.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for malformed addresses and
/// [`GatewayError::EventNotFound`] for unknown or inactive events.
#[utoipa::path(
    post,
    path = "/api/v1/pay/{token}/auth",
    tag = "Payment Page",
    summary = "Request email verification",
    description = "Mails a single-use verification link. Participants verified earlier skip the round trip and receive their payment row immediately.",
    params(("token" = String, Path, description = "Public payment token of the event")),
    request_body = AuthRequest,
    responses(
        (status = 200, description = "Link sent or participant already verified", body = AuthResponse),
        (status = 400, description = "Malformed email address", body = ErrorResponse),
        (status = 404, description = "Event not found or inactive", body = ErrorResponse),
    )
)]
pub async fn request_auth(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<AuthRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let response = match state.auth.request_verification(&token, &req.email).await? {
        VerificationRequest::AlreadyVerified {
            participant,
            status,
        } => AuthResponse {
            authenticated: true,
            participant_id: Some(participant.id),
            payment_status: Some(PaymentStatusDto::from(&status)),
            message: "Already verified.".to_string(),
        },
        VerificationRequest::LinkSent => AuthResponse {
            authenticated: false,
            participant_id: None,
            payment_status: None,
            message: "A verification link was sent to your email address.".to_string(),
        },
    };
    Ok(Json(response))
}

/// `GET /pay/{token}/verify`: Consume a verification token.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidAuthToken`] for unknown, expired or
/// foreign tokens.
#[utoipa::path(
    get,
    path = "/api/v1/pay/{token}/verify",
    tag = "Payment Page",
    summary = "Verify email",
    description = "Consumes the token from the verification link and creates the participant's payment row for the event.",
    params(
        ("token" = String, Path, description = "Public payment token of the event"),
        VerifyParams,
    ),
    responses(
        (status = 200, description = "Participant verified", body = VerifyResponse),
        (status = 400, description = "Invalid or expired token", body = ErrorResponse),
        (status = 404, description = "Event not found or inactive", body = ErrorResponse),
    )
)]
pub async fn verify(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(params): Query<VerifyParams>,
) -> Result<impl IntoResponse, GatewayError> {
    let verified = state.auth.verify(&token, &params.token).await?;
    Ok(Json(VerifyResponse {
        participant_id: verified.participant.id,
        email: verified.participant.email,
        payment_status: PaymentStatusDto::from(&verified.status),
    }))
}

/// `GET /pay/{token}/participants/{participant_id}`: Participant's payment.
///
/// # Errors
///
/// Returns [`GatewayError::EventNotFound`] or
/// [`GatewayError::ParticipantNotFound`] for unknown references.
#[utoipa::path(
    get,
    path = "/api/v1/pay/{token}/participants/{participant_id}",
    tag = "Payment Page",
    summary = "Get participant payment",
    description = "Returns the participant's payment row for the event. With `refresh=true` a pending provider charge is polled first, recovering from lost webhooks.",
    params(
        ("token" = String, Path, description = "Public payment token of the event"),
        ("participant_id" = ParticipantId, Path, description = "Participant identifier"),
        ParticipantPaymentParams,
    ),
    responses(
        (status = 200, description = "Participant payment", body = ParticipantPaymentResponse),
        (status = 404, description = "Event or participant not found", body = ErrorResponse),
    )
)]
pub async fn participant_payment(
    State(state): State<AppState>,
    Path((token, participant_id)): Path<(String, ParticipantId)>,
    Query(params): Query<ParticipantPaymentParams>,
) -> Result<impl IntoResponse, GatewayError> {
    let view = state
        .payments
        .participant_payment(&token, participant_id, params.refresh)
        .await?;
    Ok(Json(ParticipantPaymentResponse {
        participant_id: view.participant.id,
        email: view.participant.email,
        name: view.participant.name,
        is_authenticated: view.participant.is_authenticated,
        event_name: view.event.name,
        payment_status: view.status.as_ref().map(PaymentStatusDto::from),
    }))
}

/// `POST /pay/{token}/submit`: Submit a payment.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] on validation failures,
/// [`GatewayError::NotAuthenticated`] for unverified participants,
/// [`GatewayError::AlreadyPaid`] for settled rows and
/// [`GatewayError::Provider`] when the provider charge fails.
#[utoipa::path(
    post,
    path = "/api/v1/pay/{token}/submit",
    tag = "Payment Page",
    summary = "Submit payment",
    description = "Prices the selected conditions, records the attempt and returns payment instructions for the chosen method. Re-submitting while a provider charge is open returns the same charge.",
    params(("token" = String, Path, description = "Public payment token of the event")),
    request_body = SubmitPaymentRequest,
    responses(
        (status = 200, description = "Payment instructions", body = SubmitPaymentResponse),
        (status = 400, description = "Invalid submission", body = ErrorResponse),
        (status = 401, description = "Participant not verified", body = ErrorResponse),
        (status = 404, description = "Event, participant or config not found", body = ErrorResponse),
        (status = 409, description = "Already paid or concurrent update", body = ErrorResponse),
        (status = 502, description = "Provider failure, safe to retry", body = ErrorResponse),
    )
)]
pub async fn submit_payment(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<SubmitPaymentRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let receipt = state.payments.submit_payment(&token, req.into()).await?;
    Ok(Json(SubmitPaymentResponse::from(receipt)))
}

/// Payment page routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pay/{token}", get(event_page))
        .route("/pay/{token}/auth", post(request_auth))
        .route("/pay/{token}/verify", get(verify))
        .route(
            "/pay/{token}/participants/{participant_id}",
            get(participant_payment),
        )
        .route("/pay/{token}/submit", post(submit_payment))
}
