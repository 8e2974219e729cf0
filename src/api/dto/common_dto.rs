//! Shared DTO types used across multiple endpoints.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    Condition, Event, EventId, ParticipantId, PaymentConfigId, PaymentMethod, PaymentState,
    PaymentStatus, PaymentStatusId, Selections,
};

/// A payment row as shown to participants and organizers.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentStatusDto {
    /// Row identifier.
    pub id: PaymentStatusId,
    /// Paying participant.
    pub participant_id: ParticipantId,
    /// Event being paid for.
    pub event_id: EventId,
    /// Current state.
    pub status: PaymentState,
    /// Name the participant paid under.
    pub payer_name: Option<String>,
    /// Amount owed, once a method was chosen.
    pub amount: Option<i64>,
    /// Chosen condition options.
    pub selected_conditions: Selections,
    /// Chosen method.
    pub payment_method: Option<PaymentMethod>,
    /// Configuration used for the method.
    pub payment_config_id: Option<PaymentConfigId>,
    /// Provider charge handle of the live charge.
    pub charge_handle: Option<String>,
    /// URL the participant opens to pay a provider charge.
    pub payment_url: Option<String>,
    /// When the payment was confirmed.
    pub paid_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency version.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<&PaymentStatus> for PaymentStatusDto {
    fn from(status: &PaymentStatus) -> Self {
        let snapshot = status.charge_snapshot.as_ref();
        Self {
            id: status.id,
            participant_id: status.participant_id,
            event_id: status.event_id,
            status: status.state,
            payer_name: status.payer_name.clone(),
            amount: status.amount_due,
            selected_conditions: status.selections.clone(),
            payment_method: status.method,
            payment_config_id: status.payment_config_id,
            charge_handle: status.charge_handle.clone(),
            payment_url: snapshot.and_then(|s| s.payment_url.clone()),
            paid_at: snapshot.and_then(|s| s.paid_at),
            version: status.version,
            created_at: status.created_at,
            updated_at: status.updated_at,
        }
    }
}

/// Organizer view of an event.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventDto {
    /// Event identifier.
    pub id: EventId,
    /// Display name.
    pub name: String,
    /// Event date.
    pub date: Option<NaiveDate>,
    /// Base amount before condition modifiers.
    pub base_amount: i64,
    /// Priced conditions.
    pub conditions: Vec<Condition>,
    /// Enabled payment configurations.
    pub payment_config_ids: Vec<PaymentConfigId>,
    /// Whether cash is accepted.
    pub cash_enabled: bool,
    /// Public token of the payment page.
    pub payment_token: String,
    /// Whether the payment page accepts submissions.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&Event> for EventDto {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            name: event.name.clone(),
            date: event.date,
            base_amount: event.base_amount,
            conditions: event.conditions.clone(),
            payment_config_ids: event.payment_config_ids.clone(),
            cash_enabled: event.cash_enabled,
            payment_token: event.payment_token.clone(),
            is_active: event.is_active,
            created_at: event.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChargeSnapshot, ParticipantId};

    #[test]
    fn status_dto_surfaces_snapshot_fields() {
        let mut status = PaymentStatus::new(ParticipantId::new(), EventId::new());
        let paid_at = Utc::now();
        status.charge_snapshot = Some(ChargeSnapshot {
            payment_url: Some("https://qr.example/1".to_string()),
            created_at: paid_at,
            paid_at: Some(paid_at),
            provider_payload: None,
        });
        let dto = PaymentStatusDto::from(&status);
        assert_eq!(dto.payment_url.as_deref(), Some("https://qr.example/1"));
        assert_eq!(dto.paid_at, Some(paid_at));
        assert_eq!(dto.status, PaymentState::Unpaid);
    }
}
