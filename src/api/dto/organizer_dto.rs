//! DTOs for the organizer event and payment board endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::PaymentStatusDto;
use crate::domain::{
    Condition, PaymentConfigId, PaymentMethod, PaymentState, Selections, StatusEdit,
};
use crate::service::{EventChanges, EventDraft, ParticipantRegistration, PaymentBoardEntry};

/// Request body for `POST /events`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    /// Display name.
    pub name: String,
    /// Event date.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Base amount before condition modifiers.
    pub base_amount: i64,
    /// Priced conditions.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Payment configurations to enable. Absent applies the organizer's
    /// defaults.
    #[serde(default)]
    pub payment_config_ids: Option<Vec<PaymentConfigId>>,
    /// Whether cash is accepted. Defaults to `true`.
    #[serde(default = "default_cash_enabled")]
    pub cash_enabled: bool,
}

const fn default_cash_enabled() -> bool {
    true
}

impl From<CreateEventRequest> for EventDraft {
    fn from(req: CreateEventRequest) -> Self {
        Self {
            name: req.name,
            date: req.date,
            base_amount: req.base_amount,
            conditions: req.conditions,
            payment_config_ids: req.payment_config_ids,
            cash_enabled: req.cash_enabled,
        }
    }
}

/// Request body for `PUT /events/{id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateEventRequest {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New event date.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Remove the event date.
    #[serde(default)]
    pub clear_date: bool,
    /// New base amount.
    #[serde(default)]
    pub base_amount: Option<i64>,
    /// Replacement conditions.
    #[serde(default)]
    pub conditions: Option<Vec<Condition>>,
    /// Replacement set of enabled configurations.
    #[serde(default)]
    pub payment_config_ids: Option<Vec<PaymentConfigId>>,
    /// Whether cash is accepted.
    #[serde(default)]
    pub cash_enabled: Option<bool>,
    /// Open or close the payment page.
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl From<UpdateEventRequest> for EventChanges {
    fn from(req: UpdateEventRequest) -> Self {
        let date = if req.clear_date {
            Some(None)
        } else {
            req.date.map(Some)
        };
        Self {
            name: req.name,
            date,
            base_amount: req.base_amount,
            conditions: req.conditions,
            payment_config_ids: req.payment_config_ids,
            cash_enabled: req.cash_enabled,
            is_active: req.is_active,
        }
    }
}

/// One row of the payment board.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentBoardEntryDto {
    /// The payment row.
    #[serde(flatten)]
    pub payment_status: PaymentStatusDto,
    /// Participant email address.
    pub email: Option<String>,
    /// Participant display name.
    pub participant_name: Option<String>,
    /// Whether the participant passed email verification.
    pub is_authenticated: bool,
}

impl From<&PaymentBoardEntry> for PaymentBoardEntryDto {
    fn from(entry: &PaymentBoardEntry) -> Self {
        let participant = entry.participant.as_ref();
        Self {
            payment_status: PaymentStatusDto::from(&entry.status),
            email: participant.map(|p| p.email.clone()),
            participant_name: participant.and_then(|p| p.name.clone()),
            is_authenticated: participant.is_some_and(|p| p.is_authenticated),
        }
    }
}

/// Request body for `POST /events/{id}/participants`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterParticipantRequest {
    /// Participant email address.
    pub email: String,
    /// Participant display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Mark the participant verified without an email round trip.
    #[serde(default)]
    pub skip_auth: bool,
    /// Mail the participant a link to the payment page.
    #[serde(default)]
    pub send_email: bool,
}

impl From<RegisterParticipantRequest> for ParticipantRegistration {
    fn from(req: RegisterParticipantRequest) -> Self {
        Self {
            email: req.email,
            name: req.name,
            skip_auth: req.skip_auth,
            send_email: req.send_email,
        }
    }
}

/// Request body for `PATCH /events/{id}/payments/{status_id}`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdatePaymentRequest {
    /// Target state.
    #[serde(default)]
    pub status: Option<PaymentState>,
    /// Corrected payer name.
    #[serde(default)]
    pub payer_name: Option<String>,
    /// Corrected amount.
    #[serde(default)]
    pub amount: Option<i64>,
    /// Corrected method.
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    /// Corrected condition choices.
    #[serde(default)]
    pub selected_conditions: Option<Selections>,
}

impl UpdatePaymentRequest {
    /// Splits the request into a target state and a field edit.
    #[must_use]
    pub fn into_parts(self) -> (Option<PaymentState>, StatusEdit) {
        (
            self.status,
            StatusEdit {
                payer_name: self.payer_name,
                amount_due: self.amount,
                method: self.payment_method,
                selections: self.selected_conditions,
            },
        )
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn create_event_defaults_cash_on() {
        let Ok(req) =
            serde_json::from_str::<CreateEventRequest>(r#"{"name":"BBQ","base_amount":3000}"#)
        else {
            panic!("request should parse");
        };
        assert!(req.cash_enabled);
        assert!(req.conditions.is_empty());
    }

    #[test]
    fn clear_date_wins_over_date() {
        let changes = EventChanges::from(UpdateEventRequest {
            date: NaiveDate::from_ymd_opt(2025, 8, 1),
            clear_date: true,
            ..UpdateEventRequest::default()
        });
        assert_eq!(changes.date, Some(None));

        let untouched = EventChanges::from(UpdateEventRequest::default());
        assert_eq!(untouched.date, None);
    }

    #[test]
    fn update_payment_splits_state_from_edit() {
        let Ok(req) =
            serde_json::from_str::<UpdatePaymentRequest>(r#"{"status":"PAID","amount":1200}"#)
        else {
            panic!("request should parse");
        };
        let (target, edit) = req.into_parts();
        assert_eq!(target, Some(PaymentState::Paid));
        assert_eq!(edit.amount_due, Some(1200));
        assert!(edit.payer_name.is_none());
    }
}
