//! Organizer event handlers: event CRUD and the per-event payment board.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use crate::api::dto::{
    CreateEventRequest, EventDto, PaymentBoardEntryDto, PaymentStatusDto,
    RegisterParticipantRequest, UpdateEventRequest, UpdatePaymentRequest,
};
use crate::api::extract::CurrentOrganizer;
use crate::app_state::AppState;
use crate::domain::{EventId, PaymentStatusId};
use crate::error::{ErrorResponse, GatewayError};

/// `GET /events`: List the organizer's events, newest first.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthorized`] without organizer identity.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "List events",
    description = "Returns every event owned by the calling organizer, newest first.",
    responses(
        (status = 200, description = "Event list", body = Vec<EventDto>),
        (status = 401, description = "Missing organizer identity", body = ErrorResponse),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    CurrentOrganizer(organizer): CurrentOrganizer,
) -> Result<impl IntoResponse, GatewayError> {
    let events = state.organizers.list_events(&organizer).await?;
    let body: Vec<EventDto> = events.iter().map(EventDto::from).collect();
    Ok(Json(body))
}

/// `POST /events`: Create an event with a fresh payment token.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] on validation failures.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Create event",
    description = "Creates an event and its public payment page. Enabled payment configurations must belong to the caller.",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventDto),
        (status = 400, description = "Invalid event", body = ErrorResponse),
        (status = 401, description = "Missing organizer identity", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    CurrentOrganizer(organizer): CurrentOrganizer,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let event = state.organizers.create_event(&organizer, req.into()).await?;
    Ok((StatusCode::CREATED, Json(EventDto::from(&event))))
}

/// `GET /events/{id}`: Get one of the organizer's events.
///
/// # Errors
///
/// Returns [`GatewayError::EventNotFound`] or [`GatewayError::Forbidden`].
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Get event",
    params(("id" = EventId, Path, description = "Event identifier")),
    responses(
        (status = 200, description = "Event", body = EventDto),
        (status = 403, description = "Event owned by another organizer", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    CurrentOrganizer(organizer): CurrentOrganizer,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, GatewayError> {
    let event = state.organizers.get_event(&organizer, id).await?;
    Ok(Json(EventDto::from(&event)))
}

/// `PUT /events/{id}`: Update an event, including activation.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] on validation failures and
/// [`GatewayError::EventNotFound`] or [`GatewayError::Forbidden`].
#[utoipa::path(
    put,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Update event",
    description = "Applies the supplied fields; absent fields stay unchanged. `is_active=false` closes the payment page.",
    params(("id" = EventId, Path, description = "Event identifier")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Updated event", body = EventDto),
        (status = 400, description = "Invalid event", body = ErrorResponse),
        (status = 403, description = "Event owned by another organizer", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    CurrentOrganizer(organizer): CurrentOrganizer,
    Path(id): Path<EventId>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let event = state
        .organizers
        .update_event(&organizer, id, req.into())
        .await?;
    Ok(Json(EventDto::from(&event)))
}

/// `GET /events/{id}/payments`: Payment board of an event.
///
/// # Errors
///
/// Returns [`GatewayError::EventNotFound`] or [`GatewayError::Forbidden`].
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/payments",
    tag = "Payments",
    summary = "List event payments",
    description = "Returns every payment row of the event with the participant's email and name.",
    params(("id" = EventId, Path, description = "Event identifier")),
    responses(
        (status = 200, description = "Payment board", body = Vec<PaymentBoardEntryDto>),
        (status = 403, description = "Event owned by another organizer", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn payment_board(
    State(state): State<AppState>,
    CurrentOrganizer(organizer): CurrentOrganizer,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, GatewayError> {
    let board = state.organizers.payment_board(&organizer, id).await?;
    let body: Vec<PaymentBoardEntryDto> = board.iter().map(PaymentBoardEntryDto::from).collect();
    Ok(Json(body))
}

/// `POST /events/{id}/participants`: Register a participant for an event.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for malformed addresses and
/// [`GatewayError::AlreadyRegistered`] if a payment row already exists.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/participants",
    tag = "Payments",
    summary = "Register participant",
    description = "Creates the participant's payment row, optionally marking them verified and mailing them the payment page link.",
    params(("id" = EventId, Path, description = "Event identifier")),
    request_body = RegisterParticipantRequest,
    responses(
        (status = 201, description = "Participant registered", body = PaymentBoardEntryDto),
        (status = 400, description = "Malformed email address", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Already registered", body = ErrorResponse),
    )
)]
pub async fn register_participant(
    State(state): State<AppState>,
    CurrentOrganizer(organizer): CurrentOrganizer,
    Path(id): Path<EventId>,
    Json(req): Json<RegisterParticipantRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let entry = state
        .organizers
        .register_participant(&organizer, id, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(PaymentBoardEntryDto::from(&entry))))
}

/// `PATCH /events/{id}/payments/{status_id}`: Edit a payment row.
///
/// # Errors
///
/// Returns [`GatewayError::Locked`] for changes to settled rows and
/// [`GatewayError::PaymentStatusNotFound`] for unknown rows.
#[utoipa::path(
    patch,
    path = "/api/v1/events/{id}/payments/{status_id}",
    tag = "Payments",
    summary = "Update payment",
    description = "Confirms a payment manually (UNPAID/PENDING to PAID), releases a pending one (PENDING to UNPAID) or corrects fields. Rows in PAID are locked.",
    params(
        ("id" = EventId, Path, description = "Event identifier"),
        ("status_id" = PaymentStatusId, Path, description = "Payment row identifier"),
    ),
    request_body = UpdatePaymentRequest,
    responses(
        (status = 200, description = "Updated payment row", body = PaymentStatusDto),
        (status = 404, description = "Event or payment not found", body = ErrorResponse),
        (status = 409, description = "Payment locked or concurrently updated", body = ErrorResponse),
    )
)]
pub async fn update_payment(
    State(state): State<AppState>,
    CurrentOrganizer(organizer): CurrentOrganizer,
    Path((id, status_id)): Path<(EventId, PaymentStatusId)>,
    Json(req): Json<UpdatePaymentRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let (target, edit) = req.into_parts();
    let status = state
        .organizers
        .update_payment(&organizer, id, status_id, target, edit)
        .await?;
    Ok(Json(PaymentStatusDto::from(&status)))
}

/// `DELETE /events/{id}/payments/{status_id}`: Delete a payment row.
///
/// # Errors
///
/// Returns [`GatewayError::Locked`] for settled rows and
/// [`GatewayError::PaymentStatusNotFound`] for unknown rows.
#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}/payments/{status_id}",
    tag = "Payments",
    summary = "Delete payment",
    params(
        ("id" = EventId, Path, description = "Event identifier"),
        ("status_id" = PaymentStatusId, Path, description = "Payment row identifier"),
    ),
    responses(
        (status = 204, description = "Payment deleted"),
        (status = 404, description = "Event or payment not found", body = ErrorResponse),
        (status = 409, description = "Payment locked", body = ErrorResponse),
    )
)]
pub async fn delete_payment(
    State(state): State<AppState>,
    CurrentOrganizer(organizer): CurrentOrganizer,
    Path((id, status_id)): Path<(EventId, PaymentStatusId)>,
) -> Result<impl IntoResponse, GatewayError> {
    state
        .organizers
        .delete_payment(&organizer, id, status_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", get(get_event).put(update_event))
        .route("/events/{id}/payments", get(payment_board))
        .route("/events/{id}/participants", post(register_participant))
        .route(
            "/events/{id}/payments/{status_id}",
            patch(update_payment).delete(delete_payment),
        )
}
