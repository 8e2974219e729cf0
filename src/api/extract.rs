//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::domain::{Organizer, OrganizerId};
use crate::error::GatewayError;

/// Header carrying the organizer id asserted by the authenticating proxy.
pub const ORGANIZER_ID_HEADER: &str = "x-organizer-id";

/// Optional header carrying the organizer's email address.
pub const ORGANIZER_EMAIL_HEADER: &str = "x-organizer-email";

/// The organizer on whose behalf an organizer endpoint runs.
///
/// Rejects with [`GatewayError::Unauthorized`] when the id header is
/// missing or malformed, or names an unknown organizer without an email.
#[derive(Debug, Clone)]
pub struct CurrentOrganizer(pub Organizer);

impl FromRequestParts<AppState> for CurrentOrganizer {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id = header(parts, ORGANIZER_ID_HEADER)
            .and_then(|v| v.parse::<OrganizerId>().ok())
            .ok_or(GatewayError::Unauthorized)?;
        let email = header(parts, ORGANIZER_EMAIL_HEADER);
        let organizer = state.organizers.resolve_organizer(id, email).await?;
        Ok(Self(organizer))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
