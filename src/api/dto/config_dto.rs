//! DTOs for organizer payment configurations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    BankAccount, PaymentConfig, PaymentConfigId, PaymentMethod, PaypayCredentials,
    ProviderSettings,
};
use crate::error::GatewayError;

/// Provider API credentials as submitted by the organizer.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaypayCredentialsInput {
    /// API key.
    pub api_key: String,
    /// API secret. Blank or absent on update keeps the stored secret.
    #[serde(default)]
    pub api_secret: Option<String>,
    /// Merchant id.
    pub merchant_id: String,
}

/// Request body for `POST /payment-configs` and `PUT /payment-configs/{id}`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaymentConfigRequest {
    /// Method the configuration serves.
    pub payment_method: PaymentMethod,
    /// Display name shown to participants.
    pub name: String,
    /// Credentials, for `PAYPAY`.
    #[serde(default)]
    pub paypay: Option<PaypayCredentialsInput>,
    /// Pre-shared link, for `PAYPAY_LINK` and `STRIPE_LINK`.
    #[serde(default)]
    pub payment_link: Option<String>,
    /// Transfer details, for `BANK`.
    #[serde(default)]
    pub bank: Option<BankAccount>,
}

impl PaymentConfigRequest {
    /// Builds the settings for the requested method.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the section matching the
    /// method is missing, or for `CASH`, which needs no configuration.
    pub fn settings(&self) -> Result<ProviderSettings, GatewayError> {
        let missing = |what: &str| {
            GatewayError::InvalidRequest(format!(
                "{what} is required for {}",
                self.payment_method
            ))
        };
        match self.payment_method {
            PaymentMethod::Paypay => {
                let creds = self.paypay.clone().ok_or_else(|| missing("paypay"))?;
                Ok(ProviderSettings::Paypay(PaypayCredentials {
                    api_key: creds.api_key,
                    api_secret: creds.api_secret.unwrap_or_default(),
                    merchant_id: creds.merchant_id,
                }))
            }
            PaymentMethod::PaypayLink | PaymentMethod::StripeLink => {
                let payment_link = self
                    .payment_link
                    .clone()
                    .filter(|l| !l.trim().is_empty())
                    .ok_or_else(|| missing("payment_link"))?;
                Ok(ProviderSettings::Link { payment_link })
            }
            PaymentMethod::Bank => self
                .bank
                .clone()
                .map(ProviderSettings::Bank)
                .ok_or_else(|| missing("bank")),
            PaymentMethod::Cash => Err(GatewayError::InvalidRequest(
                "cash is enabled per event and needs no payment config".to_string(),
            )),
        }
    }
}

/// Response body for payment configuration endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentConfigResponse {
    /// Configuration identifier.
    pub id: PaymentConfigId,
    /// Method the configuration serves.
    pub payment_method: PaymentMethod,
    /// Display name.
    pub name: String,
    /// Provider API key, for `PAYPAY`.
    pub api_key: Option<String>,
    /// Provider merchant id, for `PAYPAY`.
    pub merchant_id: Option<String>,
    /// Whether a provider secret is stored. The secret itself is never returned.
    pub has_api_secret: bool,
    /// Pre-shared link, for link methods.
    pub payment_link: Option<String>,
    /// Transfer details, for `BANK`.
    pub bank: Option<BankAccount>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&PaymentConfig> for PaymentConfigResponse {
    fn from(config: &PaymentConfig) -> Self {
        let mut response = Self {
            id: config.id,
            payment_method: config.method,
            name: config.name.clone(),
            api_key: None,
            merchant_id: None,
            has_api_secret: false,
            payment_link: None,
            bank: None,
            created_at: config.created_at,
        };
        match &config.settings {
            ProviderSettings::Paypay(creds) => {
                response.api_key = Some(creds.api_key.clone());
                response.merchant_id = Some(creds.merchant_id.clone());
                response.has_api_secret = !creds.api_secret.is_empty();
            }
            ProviderSettings::Link { payment_link } => {
                response.payment_link = Some(payment_link.clone());
            }
            ProviderSettings::Bank(account) => response.bank = Some(account.clone()),
        }
        response
    }
}

/// Organizer-wide settings, read by `GET /settings` and replaced by
/// `PUT /settings`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrganizerSettingsDto {
    /// Configurations enabled on new events that do not list their own.
    #[serde(default)]
    pub default_payment_config_ids: Vec<PaymentConfigId>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::OrganizerId;

    fn paypay_request(secret: Option<&str>) -> PaymentConfigRequest {
        PaymentConfigRequest {
            payment_method: PaymentMethod::Paypay,
            name: "PayPay".to_string(),
            paypay: Some(PaypayCredentialsInput {
                api_key: "key".to_string(),
                api_secret: secret.map(str::to_string),
                merchant_id: "m-1".to_string(),
            }),
            payment_link: None,
            bank: None,
        }
    }

    #[test]
    fn response_never_carries_secret() {
        let Ok(settings) = paypay_request(Some("s3cret")).settings() else {
            panic!("settings expected");
        };
        let Ok(config) = PaymentConfig::new(
            OrganizerId::new(),
            PaymentMethod::Paypay,
            "PayPay".to_string(),
            settings,
        ) else {
            panic!("valid config");
        };
        let response = PaymentConfigResponse::from(&config);
        assert!(response.has_api_secret);
        let Ok(json) = serde_json::to_string(&response) else {
            panic!("serializable");
        };
        assert!(!json.contains("s3cret"));
    }

    #[test]
    fn missing_section_is_rejected() {
        let req = PaymentConfigRequest {
            payment_method: PaymentMethod::Bank,
            ..paypay_request(None)
        };
        assert!(matches!(req.settings(), Err(GatewayError::InvalidRequest(_))));
    }

    #[test]
    fn cash_needs_no_config() {
        let req = PaymentConfigRequest {
            payment_method: PaymentMethod::Cash,
            ..paypay_request(None)
        };
        assert!(req.settings().is_err());
    }
}
