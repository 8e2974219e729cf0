//! DTOs for the participant-facing payment page.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::PaymentStatusDto;
use crate::domain::{
    BankAccount, Condition, EventId, ParticipantId, PaymentConfig, PaymentConfigId,
    PaymentMethod, PaymentStatusId, Selections,
};
use crate::service::{PaymentInstructions, PaymentReceipt, PaymentSubmission};

/// One payment option offered on the event page.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentOptionDto {
    /// Configuration to submit with the choice; absent for cash.
    pub payment_config_id: Option<PaymentConfigId>,
    /// Method of the option.
    pub payment_method: PaymentMethod,
    /// Display name.
    pub name: String,
}

impl From<&PaymentConfig> for PaymentOptionDto {
    fn from(config: &PaymentConfig) -> Self {
        Self {
            payment_config_id: Some(config.id),
            payment_method: config.method,
            name: config.name.clone(),
        }
    }
}

impl PaymentOptionDto {
    /// The cash option, which needs no configuration.
    #[must_use]
    pub fn cash() -> Self {
        Self {
            payment_config_id: None,
            payment_method: PaymentMethod::Cash,
            name: PaymentMethod::Cash.label().to_string(),
        }
    }
}

/// Response body for `GET /pay/{token}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventPageResponse {
    /// Event identifier.
    pub event_id: EventId,
    /// Display name.
    pub name: String,
    /// Event date.
    pub date: Option<NaiveDate>,
    /// Base amount before condition modifiers.
    pub base_amount: i64,
    /// Priced conditions the participant chooses from.
    pub conditions: Vec<Condition>,
    /// Methods the participant may pay with.
    pub payment_options: Vec<PaymentOptionDto>,
}

/// Request body for `POST /pay/{token}/auth`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AuthRequest {
    /// Participant email address.
    pub email: String,
}

/// Response body for `POST /pay/{token}/auth`.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// `true` if the participant was verified earlier and may pay now.
    pub authenticated: bool,
    /// Participant id, present when already verified.
    pub participant_id: Option<ParticipantId>,
    /// Payment row, present when already verified.
    pub payment_status: Option<PaymentStatusDto>,
    /// Human-readable outcome.
    pub message: String,
}

/// Query parameters for `GET /pay/{token}/verify`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyParams {
    /// Token from the verification link.
    pub token: String,
}

/// Response body for `GET /pay/{token}/verify`.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    /// Verified participant.
    pub participant_id: ParticipantId,
    /// Their email address.
    pub email: String,
    /// Their payment row for the event.
    pub payment_status: PaymentStatusDto,
}

/// Query parameters for `GET /pay/{token}/participants/{participant_id}`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ParticipantPaymentParams {
    /// Poll the provider for a pending charge before answering.
    #[serde(default)]
    pub refresh: bool,
}

/// Response body for `GET /pay/{token}/participants/{participant_id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantPaymentResponse {
    /// Participant identifier.
    pub participant_id: ParticipantId,
    /// Participant email address.
    pub email: String,
    /// Participant display name.
    pub name: Option<String>,
    /// Whether the participant passed email verification.
    pub is_authenticated: bool,
    /// Event display name.
    pub event_name: String,
    /// Payment row, if one exists yet.
    pub payment_status: Option<PaymentStatusDto>,
}

/// Request body for `POST /pay/{token}/submit`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitPaymentRequest {
    /// Verified participant submitting the payment.
    pub participant_id: ParticipantId,
    /// Name to pay under.
    pub name: String,
    /// Chosen condition options.
    #[serde(default)]
    pub selected_conditions: Selections,
    /// Chosen method.
    pub payment_method: PaymentMethod,
    /// Configuration of the method; required for every method except cash.
    #[serde(default)]
    pub payment_config_id: Option<PaymentConfigId>,
}

impl From<SubmitPaymentRequest> for PaymentSubmission {
    fn from(req: SubmitPaymentRequest) -> Self {
        Self {
            participant_id: req.participant_id,
            payer_name: req.name,
            selections: req.selected_conditions,
            method: req.payment_method,
            payment_config_id: req.payment_config_id,
        }
    }
}

/// Response body for `POST /pay/{token}/submit`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitPaymentResponse {
    /// Payment row identifier.
    pub status_id: PaymentStatusId,
    /// Payment row after the submission.
    pub payment_status: PaymentStatusDto,
    /// Amount the participant owes.
    pub amount: i64,
    /// Chosen method.
    pub payment_method: PaymentMethod,
    /// URL to pay at, for provider charges and payment links.
    pub payment_url: Option<String>,
    /// Provider charge handle, for provider charges.
    pub charge_handle: Option<String>,
    /// `true` if an existing charge was returned instead of a new one.
    pub existing_payment: bool,
    /// Transfer details, for bank payments.
    pub bank_details: Option<BankAccount>,
    /// Human-readable next step.
    pub message: String,
}

impl From<PaymentReceipt> for SubmitPaymentResponse {
    fn from(receipt: PaymentReceipt) -> Self {
        let payment_status = PaymentStatusDto::from(&receipt.status);
        let payment_method = receipt.status.method.unwrap_or(PaymentMethod::Cash);
        let (payment_url, charge_handle, existing_payment, bank_details, message) =
            match receipt.instructions {
                PaymentInstructions::Cash => (
                    None,
                    None,
                    false,
                    None,
                    "Please pay the organizer in cash.".to_string(),
                ),
                PaymentInstructions::Bank(account) => (
                    None,
                    None,
                    false,
                    Some(account),
                    "Please transfer the amount to the account below.".to_string(),
                ),
                PaymentInstructions::Link { payment_link } => (
                    Some(payment_link),
                    None,
                    false,
                    None,
                    "Please complete the payment through the link.".to_string(),
                ),
                PaymentInstructions::Charge { charge, reused } => (
                    charge.payment_url,
                    Some(charge.handle),
                    reused,
                    None,
                    if reused {
                        "An existing payment is still open.".to_string()
                    } else {
                        "Payment created.".to_string()
                    },
                ),
            };
        Self {
            status_id: receipt.status.id,
            payment_status,
            amount: receipt.amount_due,
            payment_method,
            payment_url,
            charge_handle,
            existing_payment,
            bank_details,
            message,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{EventId, IssuedCharge, PaymentStatus};

    #[test]
    fn submit_request_accepts_missing_optionals() {
        let id = ParticipantId::new();
        let body = format!(
            r#"{{"participant_id":"{id}","name":"Aiko","payment_method":"CASH"}}"#
        );
        let Ok(req) = serde_json::from_str::<SubmitPaymentRequest>(&body) else {
            panic!("request should parse");
        };
        assert!(req.selected_conditions.is_empty());
        assert!(req.payment_config_id.is_none());
    }

    #[test]
    fn reused_charge_is_flagged() {
        let mut status = PaymentStatus::new(ParticipantId::new(), EventId::new());
        status.method = Some(PaymentMethod::Paypay);
        let response = SubmitPaymentResponse::from(PaymentReceipt {
            status,
            amount_due: 1500,
            instructions: PaymentInstructions::Charge {
                charge: IssuedCharge {
                    handle: "h-1".to_string(),
                    payment_url: Some("https://qr.example/h-1".to_string()),
                },
                reused: true,
            },
        });
        assert!(response.existing_payment);
        assert_eq!(response.charge_handle.as_deref(), Some("h-1"));
        assert_eq!(response.payment_method, PaymentMethod::Paypay);
        assert_eq!(response.amount, 1500);
    }
}
