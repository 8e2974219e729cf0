//! The per-(participant, event) payment record and its state machine.
//!
//! ```text
//!   UNPAID ──attempt──▶ PENDING ──completed──▶ PAID
//!     ▲                    │                    ▲
//!     └──failed/canceled───┘                    │
//!     └────────────── manual confirmation ──────┘
//! ```
//!
//! `PAID` is terminal: edits and deletion are rejected with
//! [`GatewayError::Locked`], failure notifications never regress it and a
//! repeated completion notification is a no-op.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::pricing::Selections;
use super::{EventId, ParticipantId, PaymentConfigId, PaymentMethod, PaymentStatusId};
use crate::error::GatewayError;

/// Payment state of a [`PaymentStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    /// Nothing recorded yet, or the last attempt failed.
    Unpaid,
    /// Payment instructions were issued.
    Pending,
    /// Confirmed. Terminal.
    Paid,
}

impl PaymentState {
    /// Stable wire/database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "UNPAID",
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
        }
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentState {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNPAID" => Ok(Self::Unpaid),
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            other => Err(GatewayError::InvalidRequest(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

/// Final outcome of a provider charge, from a webhook or a status poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderOutcome {
    /// The participant paid.
    Completed,
    /// The charge failed.
    Failed,
    /// The charge was canceled or expired.
    #[serde(alias = "EXPIRED")]
    Canceled,
}

/// A charge created at the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IssuedCharge {
    /// Provider-side handle (the merchant reference).
    pub handle: String,
    /// URL the participant opens to pay, when known.
    pub payment_url: Option<String>,
}

/// Provider artifacts stored with a status row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeSnapshot {
    /// URL the participant opens to pay.
    #[serde(default)]
    pub payment_url: Option<String>,
    /// When the charge was created.
    pub created_at: DateTime<Utc>,
    /// When the provider confirmed payment.
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    /// Raw provider notification that confirmed payment.
    #[serde(default)]
    pub provider_payload: Option<serde_json::Value>,
}

/// Observed state change, used to fire side effects exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State before the change.
    pub from: PaymentState,
    /// State after the change.
    pub to: PaymentState,
}

impl Transition {
    /// Returns `true` if the state did not change.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    /// Returns `true` only for the transition into `PAID`.
    #[must_use]
    pub fn entered_paid(&self) -> bool {
        self.from != PaymentState::Paid && self.to == PaymentState::Paid
    }
}

/// A recorded payment attempt from the submission flow.
#[derive(Debug, Clone)]
pub struct PaymentAttempt {
    /// Name the participant entered.
    pub payer_name: String,
    /// Condition choices.
    pub selections: Selections,
    /// Chosen method.
    pub method: PaymentMethod,
    /// Configuration used, absent for cash.
    pub payment_config_id: Option<PaymentConfigId>,
    /// Amount snapshot.
    pub amount_due: i64,
    /// Charge created at the provider, for charge-based methods.
    pub charge: Option<IssuedCharge>,
}

/// Field edits an organizer may apply to a non-paid record.
#[derive(Debug, Clone, Default)]
pub struct StatusEdit {
    /// New payer name.
    pub payer_name: Option<String>,
    /// New amount snapshot.
    pub amount_due: Option<i64>,
    /// New method.
    pub method: Option<PaymentMethod>,
    /// New selections.
    pub selections: Option<Selections>,
}

impl StatusEdit {
    /// Returns `true` if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payer_name.is_none()
            && self.amount_due.is_none()
            && self.method.is_none()
            && self.selections.is_none()
    }
}

/// The per-(participant, event) payment record. At most one exists per pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentStatus {
    /// Record identifier.
    pub id: PaymentStatusId,
    /// Paying participant.
    pub participant_id: ParticipantId,
    /// Event paid for.
    pub event_id: EventId,
    /// Current state.
    pub state: PaymentState,
    /// Name entered at submission.
    pub payer_name: Option<String>,
    /// Amount snapshot taken at submission; never recomputed.
    pub amount_due: Option<i64>,
    /// Condition choices at submission.
    pub selections: Selections,
    /// Method of the last attempt.
    pub method: Option<PaymentMethod>,
    /// Configuration of the last attempt.
    pub payment_config_id: Option<PaymentConfigId>,
    /// Provider charge handle of the live charge.
    pub charge_handle: Option<String>,
    /// Provider artifacts of the live charge.
    pub charge_snapshot: Option<ChargeSnapshot>,
    /// Number of provider charges released after a failure or a method switch.
    pub charge_attempt: i32,
    /// Optimistic concurrency version, bumped on every write.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl PaymentStatus {
    /// Creates an `UNPAID` record for the pair.
    #[must_use]
    pub fn new(participant_id: ParticipantId, event_id: EventId) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentStatusId::new(),
            participant_id,
            event_id,
            state: PaymentState::Unpaid,
            payer_name: None,
            amount_due: None,
            selections: Selections::new(),
            method: None,
            payment_config_id: None,
            charge_handle: None,
            charge_snapshot: None,
            charge_attempt: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rejects any write when the record is `PAID`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Locked`] for paid records.
    pub fn ensure_editable(&self) -> Result<(), GatewayError> {
        if self.state == PaymentState::Paid {
            return Err(GatewayError::Locked(self.id));
        }
        Ok(())
    }

    /// Returns the live provider charge if it was issued for `method`.
    #[must_use]
    pub fn existing_charge(&self, method: PaymentMethod) -> Option<IssuedCharge> {
        if self.method != Some(method) {
            return None;
        }
        self.charge_handle.as_ref().map(|handle| IssuedCharge {
            handle: handle.clone(),
            payment_url: self
                .charge_snapshot
                .as_ref()
                .and_then(|s| s.payment_url.clone()),
        })
    }

    /// Merchant reference for the next provider charge.
    ///
    /// The first charge uses the record id; charges created after a
    /// failed one get a numeric suffix so the provider does not reject
    /// them as duplicates of the dead charge.
    #[must_use]
    pub fn charge_reference(&self) -> String {
        if self.charge_attempt == 0 {
            self.id.to_string()
        } else {
            format!("{}-{}", self.id, self.charge_attempt)
        }
    }

    /// Records a submission and moves the record to `PENDING`.
    ///
    /// An attempt without a charge releases any previous one, so a later
    /// provider charge is created under a fresh reference.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AlreadyPaid`] if the record is `PAID`.
    pub fn record_attempt(
        &mut self,
        attempt: PaymentAttempt,
        now: DateTime<Utc>,
    ) -> Result<Transition, GatewayError> {
        if self.state == PaymentState::Paid {
            return Err(GatewayError::AlreadyPaid);
        }
        let from = self.state;
        self.payer_name = Some(attempt.payer_name);
        self.selections = attempt.selections;
        self.method = Some(attempt.method);
        self.payment_config_id = attempt.payment_config_id;
        self.amount_due = Some(attempt.amount_due);
        match attempt.charge {
            Some(charge) => {
                self.charge_handle = Some(charge.handle);
                self.charge_snapshot = Some(ChargeSnapshot {
                    payment_url: charge.payment_url,
                    created_at: now,
                    paid_at: None,
                    provider_payload: None,
                });
            }
            None => self.release_charge(),
        }
        self.state = PaymentState::Pending;
        Ok(Transition {
            from,
            to: self.state,
        })
    }

    /// Applies a provider outcome.
    ///
    /// `COMPLETED` moves any non-paid record to `PAID` and is a no-op on a
    /// paid one. `FAILED`/`CANCELED` regress `PENDING` to `UNPAID`,
    /// releasing the dead charge; on any other state they do nothing.
    pub fn apply_outcome(
        &mut self,
        outcome: ProviderOutcome,
        payload: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Transition {
        let from = self.state;
        match (outcome, from) {
            (ProviderOutcome::Completed, PaymentState::Paid) => {}
            (ProviderOutcome::Completed, _) => {
                self.mark_paid(payload, now);
            }
            (ProviderOutcome::Failed | ProviderOutcome::Canceled, PaymentState::Pending) => {
                self.release_charge();
                self.state = PaymentState::Unpaid;
            }
            (ProviderOutcome::Failed | ProviderOutcome::Canceled, _) => {}
        }
        Transition {
            from,
            to: self.state,
        }
    }

    /// Applies an explicit organizer state change.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Locked`] when asked to move a `PAID` record
    /// to any other state.
    pub fn admin_set_state(
        &mut self,
        target: PaymentState,
        now: DateTime<Utc>,
    ) -> Result<Transition, GatewayError> {
        let from = self.state;
        match (from, target) {
            (a, b) if a == b => {}
            (PaymentState::Paid, _) => return Err(GatewayError::Locked(self.id)),
            (_, PaymentState::Paid) => self.mark_paid(None, now),
            (PaymentState::Pending, PaymentState::Unpaid) => {
                self.release_charge();
                self.state = PaymentState::Unpaid;
            }
            (_, target) => self.state = target,
        }
        Ok(Transition {
            from,
            to: self.state,
        })
    }

    /// Applies organizer field edits.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Locked`] for paid records.
    pub fn apply_edit(&mut self, edit: StatusEdit) -> Result<(), GatewayError> {
        self.ensure_editable()?;
        if let Some(name) = edit.payer_name {
            self.payer_name = Some(name);
        }
        if let Some(amount) = edit.amount_due {
            self.amount_due = Some(amount);
        }
        if let Some(method) = edit.method {
            self.method = Some(method);
        }
        if let Some(selections) = edit.selections {
            self.selections = selections;
        }
        Ok(())
    }

    fn mark_paid(&mut self, payload: Option<serde_json::Value>, now: DateTime<Utc>) {
        let snapshot = self.charge_snapshot.get_or_insert_with(|| ChargeSnapshot {
            payment_url: None,
            created_at: now,
            paid_at: None,
            provider_payload: None,
        });
        snapshot.paid_at = Some(now);
        if payload.is_some() {
            snapshot.provider_payload = payload;
        }
        self.state = PaymentState::Paid;
    }

    fn release_charge(&mut self) {
        if self.charge_handle.take().is_some() {
            self.charge_attempt = self.charge_attempt.saturating_add(1);
        }
        self.charge_snapshot = None;
    }
}
