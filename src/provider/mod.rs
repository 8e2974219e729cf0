//! Payment provider collaborator.
//!
//! [`PaymentProvider`] is the seam between the reconciliation layer and the
//! external charge API. [`PayPayClient`] talks to the PayPay Open Payment
//! API; tests substitute scripted fakes.

pub mod paypay;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{IssuedCharge, PaypayCredentials, ProviderOutcome};

pub use paypay::PayPayClient;

/// Failure of a provider call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider already holds a charge for this merchant reference.
    #[error("duplicate charge request")]
    Duplicate,

    /// The provider answered with a business error.
    #[error("{code}: {message}")]
    Rejected {
        /// Provider result code.
        code: String,
        /// Provider message.
        message: String,
    },

    /// The request did not complete (network, timeout, TLS).
    #[error("request failed: {0}")]
    Transport(String),

    /// The provider answered with something we cannot interpret.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// A charge creation request.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    /// Merchant reference, also the idempotency key at the provider.
    pub reference: String,
    /// Amount in the smallest currency unit.
    pub amount: i64,
    /// Description shown to the payer.
    pub description: String,
}

/// Provider-side state of a charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeState {
    /// Created, not yet paid.
    Created,
    /// Paid.
    Completed,
    /// Failed.
    Failed,
    /// Canceled by payer or merchant.
    Canceled,
    /// Expired unpaid.
    Expired,
    /// Any other provider state, kept verbatim.
    Other(String),
}

impl ChargeState {
    /// Parses a provider status string.
    #[must_use]
    pub fn from_provider(status: &str) -> Self {
        match status {
            "CREATED" | "AUTHORIZED" => Self::Created,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            "CANCELED" => Self::Canceled,
            "EXPIRED" => Self::Expired,
            other => Self::Other(other.to_string()),
        }
    }

    /// Final outcome, if the charge reached one.
    #[must_use]
    pub const fn outcome(&self) -> Option<ProviderOutcome> {
        match self {
            Self::Completed => Some(ProviderOutcome::Completed),
            Self::Failed => Some(ProviderOutcome::Failed),
            Self::Canceled | Self::Expired => Some(ProviderOutcome::Canceled),
            Self::Created | Self::Other(_) => None,
        }
    }
}

impl fmt::Display for ChargeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("CREATED"),
            Self::Completed => f.write_str("COMPLETED"),
            Self::Failed => f.write_str("FAILED"),
            Self::Canceled => f.write_str("CANCELED"),
            Self::Expired => f.write_str("EXPIRED"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// External charge API.
#[async_trait]
pub trait PaymentProvider: Send + Sync + fmt::Debug {
    /// Creates a charge for `request.amount` tagged with `request.reference`.
    ///
    /// # Errors
    ///
    /// [`ProviderError::Duplicate`] when a charge for the reference already
    /// exists; any other variant for genuine failures.
    async fn create_charge(
        &self,
        credentials: &PaypayCredentials,
        request: &ChargeRequest,
    ) -> Result<IssuedCharge, ProviderError>;

    /// Looks up the current state of the charge with `handle`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the lookup fails.
    async fn charge_status(
        &self,
        credentials: &PaypayCredentials,
        handle: &str,
    ) -> Result<ChargeState, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_have_outcomes() {
        assert_eq!(
            ChargeState::from_provider("COMPLETED").outcome(),
            Some(ProviderOutcome::Completed)
        );
        assert_eq!(
            ChargeState::from_provider("EXPIRED").outcome(),
            Some(ProviderOutcome::Canceled)
        );
        assert_eq!(ChargeState::from_provider("CREATED").outcome(), None);
        assert_eq!(
            ChargeState::from_provider("REFUNDED"),
            ChargeState::Other("REFUNDED".to_string())
        );
    }
}
