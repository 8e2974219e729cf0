//! Payment methods and organizer-owned payment configurations.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{OrganizerId, PaymentConfigId};
use crate::error::GatewayError;

/// The way a participant pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Dynamic PayPay QR charge created through the provider API.
    #[serde(alias = "PAYPAY_MERCHANT")]
    Paypay,
    /// Pre-shared PayPay payment link.
    PaypayLink,
    /// Pre-shared Stripe payment link.
    #[serde(alias = "STRIPE")]
    StripeLink,
    /// Bank transfer to the organizer's account.
    Bank,
    /// Cash handed to the organizer.
    Cash,
}

impl PaymentMethod {
    /// All supported methods, in display order.
    pub const ALL: [Self; 5] = [
        Self::Paypay,
        Self::PaypayLink,
        Self::StripeLink,
        Self::Bank,
        Self::Cash,
    ];

    /// Stable wire/database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paypay => "PAYPAY",
            Self::PaypayLink => "PAYPAY_LINK",
            Self::StripeLink => "STRIPE_LINK",
            Self::Bank => "BANK",
            Self::Cash => "CASH",
        }
    }

    /// Human-readable label used in notifications.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Paypay => "PayPay",
            Self::PaypayLink => "PayPay (link)",
            Self::StripeLink => "Stripe",
            Self::Bank => "Bank transfer",
            Self::Cash => "Cash",
        }
    }

    /// Whether a submission with this method needs a [`PaymentConfig`].
    #[must_use]
    pub const fn requires_config(self) -> bool {
        !matches!(self, Self::Cash)
    }

    /// Whether this method creates a charge through the provider API.
    #[must_use]
    pub const fn creates_charge(self) -> bool {
        matches!(self, Self::Paypay)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAYPAY" | "PAYPAY_MERCHANT" => Ok(Self::Paypay),
            "PAYPAY_LINK" => Ok(Self::PaypayLink),
            "STRIPE_LINK" | "STRIPE" => Ok(Self::StripeLink),
            "BANK" => Ok(Self::Bank),
            "CASH" => Ok(Self::Cash),
            other => Err(GatewayError::InvalidRequest(format!(
                "unknown payment method: {other}"
            ))),
        }
    }
}

/// Credentials for the PayPay Open Payment API.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaypayCredentials {
    /// API key (client id).
    pub api_key: String,
    /// API secret used for request signing.
    pub api_secret: String,
    /// Merchant id sent as `X-ASSUME-MERCHANT`.
    pub merchant_id: String,
}

impl fmt::Debug for PaypayCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaypayCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("merchant_id", &self.merchant_id)
            .finish()
    }
}

/// Bank account shown to participants paying by transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BankAccount {
    /// Bank name.
    pub bank_name: String,
    /// Branch name.
    pub branch_name: String,
    /// Account type, e.g. "ordinary".
    pub account_type: String,
    /// Account number.
    pub account_number: String,
    /// Account holder name.
    pub account_holder: String,
}

/// Method-specific settings stored with a [`PaymentConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderSettings {
    /// Provider API credentials for dynamic charges.
    Paypay(PaypayCredentials),
    /// A pre-shared payment link returned verbatim.
    Link {
        /// The link participants are sent to.
        payment_link: String,
    },
    /// Bank transfer details.
    Bank(BankAccount),
}

impl ProviderSettings {
    /// Returns `true` if these settings can serve `method`.
    #[must_use]
    pub const fn supports(&self, method: PaymentMethod) -> bool {
        matches!(
            (self, method),
            (Self::Paypay(_), PaymentMethod::Paypay)
                | (
                    Self::Link { .. },
                    PaymentMethod::PaypayLink | PaymentMethod::StripeLink
                )
                | (Self::Bank(_), PaymentMethod::Bank)
        )
    }

    /// Merges an update into the stored settings.
    ///
    /// A blank provider secret in the update keeps the stored secret, so
    /// configuration forms never need to echo secrets back.
    #[must_use]
    pub fn merged_with(self, update: Self) -> Self {
        match (self, update) {
            (Self::Paypay(current), Self::Paypay(mut next)) => {
                if next.api_secret.trim().is_empty() {
                    next.api_secret = current.api_secret;
                }
                Self::Paypay(next)
            }
            (_, next) => next,
        }
    }
}

/// Organizer-owned configuration of one payment method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfig {
    /// Configuration identifier.
    pub id: PaymentConfigId,
    /// Owning organizer.
    pub organizer_id: OrganizerId,
    /// Method this configuration serves.
    pub method: PaymentMethod,
    /// Display name shown to participants.
    pub name: String,
    /// Method-specific settings.
    pub settings: ProviderSettings,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl PaymentConfig {
    /// Builds a configuration, checking that the settings fit the method.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if `settings` cannot serve
    /// `method` or the name is blank.
    pub fn new(
        organizer_id: OrganizerId,
        method: PaymentMethod,
        name: String,
        settings: ProviderSettings,
    ) -> Result<Self, GatewayError> {
        validate_config(method, &name, &settings)?;
        Ok(Self {
            id: PaymentConfigId::new(),
            organizer_id,
            method,
            name,
            settings,
            created_at: Utc::now(),
        })
    }

    /// Applies an organizer update, keeping the stored secret when blank.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the updated settings
    /// cannot serve the updated method.
    pub fn apply_update(
        &mut self,
        method: PaymentMethod,
        name: String,
        settings: ProviderSettings,
    ) -> Result<(), GatewayError> {
        let merged = self.settings.clone().merged_with(settings);
        validate_config(method, &name, &merged)?;
        self.method = method;
        self.name = name;
        self.settings = merged;
        Ok(())
    }
}

fn validate_config(
    method: PaymentMethod,
    name: &str,
    settings: &ProviderSettings,
) -> Result<(), GatewayError> {
    if name.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "payment config name is required".to_string(),
        ));
    }
    if !settings.supports(method) {
        return Err(GatewayError::InvalidRequest(format!(
            "settings do not match payment method {method}"
        )));
    }
    if let ProviderSettings::Paypay(creds) = settings
        && (creds.api_key.is_empty() || creds.api_secret.is_empty() || creds.merchant_id.is_empty())
    {
        return Err(GatewayError::InvalidRequest(
            "paypay credentials require api_key, api_secret and merchant_id".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn creds(secret: &str) -> ProviderSettings {
        ProviderSettings::Paypay(PaypayCredentials {
            api_key: "key".to_string(),
            api_secret: secret.to_string(),
            merchant_id: "m-1".to_string(),
        })
    }

    #[test]
    fn blank_secret_keeps_stored_value() {
        let Ok(mut config) = PaymentConfig::new(
            OrganizerId::new(),
            PaymentMethod::Paypay,
            "PayPay".to_string(),
            creds("s3cret"),
        ) else {
            panic!("valid config");
        };

        let result =
            config.apply_update(PaymentMethod::Paypay, "PayPay QR".to_string(), creds("  "));
        assert!(result.is_ok());
        assert_eq!(config.settings, creds("s3cret"));
        assert_eq!(config.name, "PayPay QR");
    }

    #[test]
    fn non_blank_secret_replaces_stored_value() {
        let merged = creds("old").merged_with(creds("new"));
        assert_eq!(merged, creds("new"));
    }

    #[test]
    fn rejects_settings_for_other_method() {
        let result = PaymentConfig::new(
            OrganizerId::new(),
            PaymentMethod::Bank,
            "Bank".to_string(),
            ProviderSettings::Link {
                payment_link: "https://example.com/pay".to_string(),
            },
        );
        assert!(matches!(result, Err(GatewayError::InvalidRequest(_))));
    }

    #[test]
    fn link_settings_serve_both_link_methods() {
        let link = ProviderSettings::Link {
            payment_link: "https://pay.example".to_string(),
        };
        assert!(link.supports(PaymentMethod::PaypayLink));
        assert!(link.supports(PaymentMethod::StripeLink));
        assert!(!link.supports(PaymentMethod::Paypay));
    }

    #[test]
    fn method_names_round_trip() {
        for method in PaymentMethod::ALL {
            let parsed: Result<PaymentMethod, _> = method.as_str().parse();
            assert_eq!(parsed.ok(), Some(method));
        }
        assert_eq!("STRIPE".parse::<PaymentMethod>().ok(), Some(PaymentMethod::StripeLink));
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", creds("s3cret"));
        assert!(!rendered.contains("s3cret"));
    }
}
