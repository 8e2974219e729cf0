//! Database row models and their conversion to domain types.
//!
//! Rows mirror the tables in `migrations/` column for column. JSONB
//! columns hold versioned documents (see [`super::documents`]) and are
//! decoded here, once.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::documents::{decode, decode_opt};
use crate::domain::{
    Event, Organizer, Participant, PaymentConfig, PaymentConfigId, PaymentStatus,
};
use crate::error::GatewayError;

/// A row of the `organizers` table.
#[derive(Debug, Clone, FromRow)]
pub struct OrganizerRow {
    /// Primary key.
    pub id: Uuid,
    /// Login email.
    pub email: String,
    /// Mail sender reference.
    pub mail_sender: Option<String>,
    /// Configurations enabled on new events by default.
    pub default_payment_config_ids: Vec<Uuid>,
}

impl From<OrganizerRow> for Organizer {
    fn from(row: OrganizerRow) -> Self {
        Self {
            id: row.id.into(),
            email: row.email,
            mail_sender: row.mail_sender,
            default_payment_config_ids: row
                .default_payment_config_ids
                .into_iter()
                .map(PaymentConfigId::from)
                .collect(),
        }
    }
}

/// A row of the `events` table.
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning organizer.
    pub organizer_id: Uuid,
    /// Display name.
    pub name: String,
    /// Optional event date.
    pub date: Option<NaiveDate>,
    /// Base amount.
    pub base_amount: i64,
    /// Enveloped condition list.
    pub conditions: serde_json::Value,
    /// Enabled payment configurations.
    pub payment_config_ids: Vec<Uuid>,
    /// Cash flag.
    pub cash_enabled: bool,
    /// Public payment token.
    pub payment_token: String,
    /// Active flag.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = GatewayError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            organizer_id: row.organizer_id.into(),
            name: row.name,
            date: row.date,
            base_amount: row.base_amount,
            conditions: decode(row.conditions)?,
            payment_config_ids: row
                .payment_config_ids
                .into_iter()
                .map(PaymentConfigId::from)
                .collect(),
            cash_enabled: row.cash_enabled,
            payment_token: row.payment_token,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

/// A row of the `payment_configs` table.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentConfigRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning organizer.
    pub organizer_id: Uuid,
    /// Method name.
    pub method: String,
    /// Display name.
    pub name: String,
    /// Enveloped provider settings.
    pub settings: serde_json::Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PaymentConfigRow> for PaymentConfig {
    type Error = GatewayError;

    fn try_from(row: PaymentConfigRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            organizer_id: row.organizer_id.into(),
            method: row.method.parse().map_err(corrupt)?,
            name: row.name,
            settings: decode(row.settings)?,
            created_at: row.created_at,
        })
    }
}

/// A row of the `participants` table.
#[derive(Debug, Clone, FromRow)]
pub struct ParticipantRow {
    /// Primary key.
    pub id: Uuid,
    /// Normalized email.
    pub email: String,
    /// Display name.
    pub name: Option<String>,
    /// Pending verification token.
    pub auth_token: Option<String>,
    /// Token expiry.
    pub auth_token_expires_at: Option<DateTime<Utc>>,
    /// Event that requested the token.
    pub auth_event_id: Option<Uuid>,
    /// Verified flag.
    pub is_authenticated: bool,
    /// Linked chat identity.
    pub chat_user_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<ParticipantRow> for Participant {
    fn from(row: ParticipantRow) -> Self {
        Self {
            id: row.id.into(),
            email: row.email,
            name: row.name,
            auth_token: row.auth_token,
            auth_token_expires_at: row.auth_token_expires_at,
            auth_event_id: row.auth_event_id.map(Into::into),
            is_authenticated: row.is_authenticated,
            chat_user_id: row.chat_user_id,
            created_at: row.created_at,
        }
    }
}

/// A row of the `payment_statuses` table.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentStatusRow {
    /// Primary key.
    pub id: Uuid,
    /// Paying participant.
    pub participant_id: Uuid,
    /// Event paid for.
    pub event_id: Uuid,
    /// State name.
    pub state: String,
    /// Name entered at submission.
    pub payer_name: Option<String>,
    /// Amount snapshot.
    pub amount_due: Option<i64>,
    /// Enveloped selections.
    pub selections: serde_json::Value,
    /// Method name.
    pub method: Option<String>,
    /// Configuration used.
    pub payment_config_id: Option<Uuid>,
    /// Live charge handle.
    pub charge_handle: Option<String>,
    /// Enveloped charge snapshot.
    pub charge_snapshot: Option<serde_json::Value>,
    /// Abandoned charge counter.
    pub charge_attempt: i32,
    /// Concurrency version.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentStatusRow> for PaymentStatus {
    type Error = GatewayError;

    fn try_from(row: PaymentStatusRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            participant_id: row.participant_id.into(),
            event_id: row.event_id.into(),
            state: row.state.parse().map_err(corrupt)?,
            payer_name: row.payer_name,
            amount_due: row.amount_due,
            selections: decode(row.selections)?,
            method: row
                .method
                .map(|m| m.parse())
                .transpose()
                .map_err(corrupt)?,
            payment_config_id: row.payment_config_id.map(Into::into),
            charge_handle: row.charge_handle,
            charge_snapshot: decode_opt(row.charge_snapshot)?,
            charge_attempt: row.charge_attempt,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn corrupt(e: GatewayError) -> GatewayError {
    GatewayError::PersistenceError(format!("corrupt row: {e}"))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{PaymentMethod, PaymentState};

    fn status_row() -> PaymentStatusRow {
        PaymentStatusRow {
            id: Uuid::new_v4(),
            participant_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            state: "PENDING".to_string(),
            payer_name: Some("Aiko".to_string()),
            amount_due: Some(3500),
            selections: serde_json::json!({"schema_version": 1, "data": {"size": "b"}}),
            method: Some("BANK".to_string()),
            payment_config_id: None,
            charge_handle: None,
            charge_snapshot: None,
            charge_attempt: 0,
            version: 3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn status_row_decodes() {
        let Ok(status) = PaymentStatus::try_from(status_row()) else {
            panic!("row should decode");
        };
        assert_eq!(status.state, PaymentState::Pending);
        assert_eq!(status.method, Some(PaymentMethod::Bank));
        assert_eq!(status.version, 3);
        assert!(status.selections.get("size").is_some());
    }

    #[test]
    fn unknown_state_is_a_persistence_error() {
        let mut row = status_row();
        row.state = "REFUNDED".to_string();
        assert!(matches!(
            PaymentStatus::try_from(row),
            Err(GatewayError::PersistenceError(_))
        ));
    }
}
