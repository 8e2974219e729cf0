//! Shared fixtures for router-level tests: an in-memory app with a
//! scripted provider and a recording mailer.

#![allow(clippy::panic, dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use tower::ServiceExt;

use paylink_gateway::api::build_router;
use paylink_gateway::api::extract::{ORGANIZER_EMAIL_HEADER, ORGANIZER_ID_HEADER};
use paylink_gateway::app_state::AppState;
use paylink_gateway::domain::{IssuedCharge, OrganizerId, PaypayCredentials};
use paylink_gateway::notify::{MailError, Mailer, OutgoingMail};
use paylink_gateway::persistence::{InMemoryStore, PaymentStore};
use paylink_gateway::provider::{ChargeRequest, ChargeState, PaymentProvider, ProviderError};

/// Provider double issuing one charge per reference.
#[derive(Debug, Default)]
pub struct StubProvider {
    creates: AtomicUsize,
}

impl StubProvider {
    /// Number of charge creation calls received.
    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProvider for StubProvider {
    async fn create_charge(
        &self,
        _credentials: &PaypayCredentials,
        request: &ChargeRequest,
    ) -> Result<IssuedCharge, ProviderError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(IssuedCharge {
            handle: request.reference.clone(),
            payment_url: Some(format!("https://qr.example/{}", request.reference)),
        })
    }

    async fn charge_status(
        &self,
        _credentials: &PaypayCredentials,
        _handle: &str,
    ) -> Result<ChargeState, ProviderError> {
        Ok(ChargeState::Created)
    }
}

/// Mailer double recording every message.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingMailer {
    /// Messages sent so far.
    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, _sender: &str, mail: &OutgoingMail) -> Result<(), MailError> {
        self.sent.lock().await.push(mail.clone());
        Ok(())
    }
}

/// A router wired against in-memory collaborators.
pub struct TestApp {
    /// The application router.
    pub router: Router,
    /// The provider double.
    pub provider: Arc<StubProvider>,
    /// The mailer double.
    pub mailer: Arc<RecordingMailer>,
    /// Organizer identity used by [`TestApp::organizer_request`].
    pub organizer_id: OrganizerId,
}

impl TestApp {
    /// Builds a fresh app.
    pub fn new() -> Self {
        let store: Arc<dyn PaymentStore> = Arc::new(InMemoryStore::new());
        let provider = Arc::new(StubProvider::default());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(
            store,
            Arc::<StubProvider>::clone(&provider),
            Arc::<RecordingMailer>::clone(&mailer),
            "https://pay.example".to_string(),
            chrono::Duration::minutes(30),
        );
        Self {
            router: build_router().with_state(state),
            provider,
            mailer,
            organizer_id: OrganizerId::new(),
        }
    }

    /// Sends a participant-side request.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send(build(method, uri, body, None)).await
    }

    /// Sends a request as the test organizer.
    pub async fn organizer_request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send(build(method, uri, body, Some(self.organizer_id))).await
    }

    /// Sends a request as another organizer.
    pub async fn request_as(
        &self,
        organizer: OrganizerId,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send(build(method, uri, body, Some(organizer))).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let Ok(response) = self.router.clone().oneshot(request).await else {
            panic!("router is infallible");
        };
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body should be readable");
        };
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

fn build(
    method: Method,
    uri: &str,
    body: Option<Value>,
    organizer: Option<OrganizerId>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = organizer {
        builder = builder
            .header(ORGANIZER_ID_HEADER, id.to_string())
            .header(ORGANIZER_EMAIL_HEADER, format!("organizer-{id}@example.com"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let Ok(request) = builder.body(body) else {
        panic!("request should build");
    };
    request
}

/// Extracts the token from a verification mail body.
pub fn verification_token(body: &str) -> Option<String> {
    body.split("?token=")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .map(str::to_string)
}

/// Reads a string field from a JSON object.
pub fn str_field(value: &Value, key: &str) -> String {
    let Some(s) = value.get(key).and_then(Value::as_str) else {
        panic!("missing string field {key} in {value}");
    };
    s.to_string()
}
