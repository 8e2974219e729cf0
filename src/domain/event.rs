//! Organizer-defined payable events.

use chrono::{DateTime, NaiveDate, Utc};

use super::pricing::{Condition, Selections, compute_total};
use super::{EventId, OrganizerId, PaymentConfigId, PaymentMethod};

/// An organizer account, as far as the payment core needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organizer {
    /// Organizer identifier.
    pub id: OrganizerId,
    /// Login email.
    pub email: String,
    /// Sender reference handed to the mail collaborator. `None` disables
    /// outgoing mail for this organizer's events.
    pub mail_sender: Option<String>,
    /// Configurations enabled on new events that do not list their own.
    pub default_payment_config_ids: Vec<PaymentConfigId>,
}

/// A payable occasion with a base price and optional priced conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Owning organizer.
    pub organizer_id: OrganizerId,
    /// Display name.
    pub name: String,
    /// Optional event date.
    pub date: Option<NaiveDate>,
    /// Base amount in the smallest currency unit.
    pub base_amount: i64,
    /// Ordered condition catalog.
    pub conditions: Vec<Condition>,
    /// Payment configurations participants may choose from.
    pub payment_config_ids: Vec<PaymentConfigId>,
    /// Whether cash payment is offered.
    pub cash_enabled: bool,
    /// Capability-bearing URL slug of the public payment page.
    pub payment_token: String,
    /// Inactive events reject all participant traffic.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Creates an active event with a fresh payment token.
    #[must_use]
    pub fn new(organizer_id: OrganizerId, name: String, base_amount: i64) -> Self {
        Self {
            id: EventId::new(),
            organizer_id,
            name,
            date: None,
            base_amount,
            conditions: Vec::new(),
            payment_config_ids: Vec::new(),
            cash_enabled: true,
            payment_token: uuid::Uuid::new_v4().simple().to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Prices `selections` against this event's catalog.
    #[must_use]
    pub fn total_for(&self, selections: &Selections) -> i64 {
        compute_total(self.base_amount, &self.conditions, selections)
    }

    /// Returns `true` if `method` (through `config_id` when required) is
    /// enabled for this event.
    #[must_use]
    pub fn accepts(&self, method: PaymentMethod, config_id: Option<PaymentConfigId>) -> bool {
        match (method, config_id) {
            (PaymentMethod::Cash, _) => self.cash_enabled,
            (_, Some(id)) => self.payment_config_ids.contains(&id),
            (_, None) => false,
        }
    }
}
