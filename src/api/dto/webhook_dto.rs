//! Provider webhook payloads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Transaction notification posted by the provider.
///
/// Only the fields the gateway acts on are typed; the full payload is kept
/// verbatim on the payment row.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaypayNotification {
    /// Merchant reference the charge was created with.
    pub merchant_payment_id: String,
    /// Provider state, e.g. `COMPLETED`, `FAILED`, `CANCELED`, `EXPIRED`.
    pub state: String,
    /// Notification kind, e.g. `Transaction`.
    #[serde(default)]
    pub notification_type: Option<String>,
}

/// Acknowledgement returned to the provider.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    /// Always `true` once the payload was parsed.
    pub received: bool,
    /// Whether the notification changed a payment row.
    pub applied: bool,
}
