//! PayPay Open Payment API client.
//!
//! Creates dynamic ORDER_QR codes and polls their payment state. Requests
//! are signed with the "OPA-Auth" HMAC-SHA256 scheme:
//!
//! ```text
//! hash      = base64(md5(content_type ++ body))        | "empty" without body
//! mac_input = path \n method \n nonce \n epoch \n content_type \n hash
//! header    = "hmac OPA-Auth:" key ":" base64(hmac(secret, mac_input)) ":" nonce ":" epoch ":" hash
//! ```

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;

use super::{ChargeRequest, ChargeState, PaymentProvider, ProviderError};
use crate::domain::{IssuedCharge, PaypayCredentials};

/// Sandbox API host.
pub const SANDBOX_BASE_URL: &str = "https://stg-api.sandbox.paypay.ne.jp";

/// Production API host.
pub const PRODUCTION_BASE_URL: &str = "https://api.paypay.ne.jp";

const CREATE_CODE_PATH: &str = "/v2/codes";
const PAYMENT_DETAILS_PATH: &str = "/v2/codes/payments";
const SIGNED_CONTENT_TYPE: &str = "application/json;charset=UTF-8;";
const DUPLICATE_CODE: &str = "DUPLICATE_DYNAMIC_QR_REQUEST";
const SUCCESS_CODE: &str = "SUCCESS";

/// HTTP client for the PayPay API.
#[derive(Debug, Clone)]
pub struct PayPayClient {
    http: Client,
    base_url: String,
    redirect_url: String,
}

impl PayPayClient {
    /// Builds a client for `base_url`; payers return to `redirect_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] if the HTTP client cannot be
    /// constructed.
    pub fn new(
        base_url: impl Into<String>,
        redirect_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("paylink-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            redirect_url: redirect_url.into(),
        })
    }

    async fn send_signed(
        &self,
        credentials: &PaypayCredentials,
        method: reqwest::Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<ApiResponse, ProviderError> {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let nonce = nonce.get(..8).unwrap_or(&nonce).to_string();
        let epoch = chrono::Utc::now().timestamp();
        let authorization = sign_request(
            credentials,
            method.as_str(),
            path,
            &nonce,
            epoch,
            body.as_deref(),
        )?;

        let mut request = self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .header("Authorization", authorization)
            .header("X-ASSUME-MERCHANT", &credentials.merchant_id);
        if let Some(body) = body {
            request = request
                .header("Content-Type", "application/json")
                .body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let http_status = response.status();
        let parsed = response
            .json::<ApiResponse>()
            .await
            .map_err(|e| ProviderError::Malformed(format!("http {http_status}: {e}")))?;

        tracing::info!(
            path,
            http_status = http_status.as_u16(),
            result_code = %parsed.result_info.code,
            "paypay api response"
        );
        Ok(parsed)
    }
}

#[async_trait]
impl PaymentProvider for PayPayClient {
    async fn create_charge(
        &self,
        credentials: &PaypayCredentials,
        request: &ChargeRequest,
    ) -> Result<IssuedCharge, ProviderError> {
        let payload = serde_json::json!({
            "merchantPaymentId": request.reference,
            "amount": { "amount": request.amount, "currency": "JPY" },
            "codeType": "ORDER_QR",
            "orderDescription": request.description,
            "redirectUrl": self.redirect_url,
            "redirectType": "WEB_LINK",
            "isAuthorization": false,
        });
        let body =
            serde_json::to_vec(&payload).map_err(|e| ProviderError::Malformed(e.to_string()))?;

        tracing::info!(
            reference = %request.reference,
            amount = request.amount,
            merchant_id = %credentials.merchant_id,
            "creating paypay charge"
        );

        let response = self
            .send_signed(
                credentials,
                reqwest::Method::POST,
                CREATE_CODE_PATH,
                Some(body),
            )
            .await?;

        match response.result_info.code.as_str() {
            SUCCESS_CODE => Ok(IssuedCharge {
                handle: request.reference.clone(),
                payment_url: response.data.and_then(|d| d.url),
            }),
            DUPLICATE_CODE => Err(ProviderError::Duplicate),
            _ => Err(response.into_rejection()),
        }
    }

    async fn charge_status(
        &self,
        credentials: &PaypayCredentials,
        handle: &str,
    ) -> Result<ChargeState, ProviderError> {
        let path = format!("{PAYMENT_DETAILS_PATH}/{handle}");
        let response = self
            .send_signed(credentials, reqwest::Method::GET, &path, None)
            .await?;
        if response.result_info.code != SUCCESS_CODE {
            return Err(response.into_rejection());
        }
        let status = response
            .data
            .and_then(|d| d.status)
            .ok_or_else(|| ProviderError::Malformed("missing data.status".to_string()))?;
        Ok(ChargeState::from_provider(&status))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    result_info: ResultInfo,
    #[serde(default)]
    data: Option<ApiData>,
}

impl ApiResponse {
    fn into_rejection(self) -> ProviderError {
        ProviderError::Rejected {
            code: self.result_info.code,
            message: self.result_info.message.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    code: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Builds the `Authorization` header value for a request.
fn sign_request(
    credentials: &PaypayCredentials,
    method: &str,
    path: &str,
    nonce: &str,
    epoch: i64,
    body: Option<&[u8]>,
) -> Result<String, ProviderError> {
    let (content_type, hash) = match body {
        Some(body) => {
            let mut md5 = Md5::new();
            md5.update(SIGNED_CONTENT_TYPE.as_bytes());
            md5.update(body);
            (SIGNED_CONTENT_TYPE, STANDARD.encode(md5.finalize()))
        }
        None => ("empty", "empty".to_string()),
    };

    let epoch = epoch.to_string();
    let mac_input = [path, method, nonce, epoch.as_str(), content_type, hash.as_str()].join("\n");
    let mut mac = Hmac::<Sha256>::new_from_slice(credentials.api_secret.as_bytes())
        .map_err(|e| ProviderError::Malformed(format!("invalid api secret: {e}")))?;
    mac.update(mac_input.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    Ok(format!(
        "hmac OPA-Auth:{}:{signature}:{nonce}:{epoch}:{hash}",
        credentials.api_key
    ))
}
