//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::PaymentStatusId;
use crate::provider::ProviderError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2201,
///     "message": "already paid",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see [`GatewayError`] code ranges).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category                       | HTTP Status                     |
/// |-----------|--------------------------------|---------------------------------|
/// | 1000–1999 | Validation                     | 400 Bad Request                 |
/// | 2000–2099 | Not Found                      | 404 Not Found                   |
/// | 2100–2199 | Authentication / Ownership     | 401 Unauthorized / 403 Forbidden |
/// | 2200–2299 | State Conflict                 | 409 Conflict                    |
/// | 3000–3999 | Server / Upstream              | 500 / 502                       |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Verification token unknown, used or expired.
    #[error("invalid or expired verification token")]
    InvalidAuthToken,

    /// No active event for the given id or payment token.
    #[error("event not found")]
    EventNotFound,

    /// Participant does not exist.
    #[error("participant not found")]
    ParticipantNotFound,

    /// Payment record does not exist.
    #[error("payment status not found")]
    PaymentStatusNotFound,

    /// Payment configuration does not exist or is not usable here.
    #[error("payment config not found")]
    PaymentConfigNotFound,

    /// Organizer identity missing from the request.
    #[error("organizer identity required")]
    Unauthorized,

    /// Participant has not verified their email.
    #[error("participant not authenticated")]
    NotAuthenticated,

    /// Resource belongs to another organizer.
    #[error("forbidden")]
    Forbidden,

    /// Submission against a record that is already paid.
    #[error("already paid")]
    AlreadyPaid,

    /// Mutation of a paid record.
    #[error("payment {0} is paid and locked")]
    Locked(PaymentStatusId),

    /// A concurrent write won the compare-and-swap; the client may retry.
    #[error("payment status changed concurrently; retry")]
    ConcurrentUpdate,

    /// Participant is already registered for the event.
    #[error("participant already registered for this event")]
    AlreadyRegistered,

    /// Payment provider call failed; the record was left unchanged.
    #[error("payment provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidAuthToken => 1002,
            Self::EventNotFound => 2001,
            Self::ParticipantNotFound => 2002,
            Self::PaymentStatusNotFound => 2003,
            Self::PaymentConfigNotFound => 2004,
            Self::Unauthorized => 2101,
            Self::NotAuthenticated => 2102,
            Self::Forbidden => 2103,
            Self::AlreadyPaid => 2201,
            Self::Locked(_) => 2202,
            Self::ConcurrentUpdate => 2203,
            Self::AlreadyRegistered => 2204,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::Provider(_) => 3101,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidAuthToken => StatusCode::BAD_REQUEST,
            Self::EventNotFound
            | Self::ParticipantNotFound
            | Self::PaymentStatusNotFound
            | Self::PaymentConfigNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::AlreadyPaid
            | Self::Locked(_)
            | Self::ConcurrentUpdate
            | Self::AlreadyRegistered => StatusCode::CONFLICT,
            Self::Provider(_) => StatusCode::BAD_GATEWAY,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the client may retry the same request unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::ConcurrentUpdate)
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(e: sqlx::Error) -> Self {
        Self::PersistenceError(e.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: self.is_retryable().then(|| "retryable".to_string()),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
