//! Organizer endpoints through the HTTP router: identity, ownership,
//! payment board administration and configuration secrets.

#![allow(clippy::panic)]

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use common::{TestApp, str_field};
use paylink_gateway::domain::{OrganizerId, PaymentConfigId};

async fn create_event(app: &TestApp) -> String {
    let (status, event) = app
        .organizer_request(
            Method::POST,
            "/api/v1/events",
            Some(json!({"name": "Board Games Night", "base_amount": 1000})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{event}");
    str_field(&event, "id")
}

#[tokio::test]
async fn organizer_identity_is_required() {
    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, "/api/v1/events", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body.get("error").and_then(|e| e.get("code")),
        Some(&json!(2101))
    );
}

#[tokio::test]
async fn events_are_private_to_their_organizer() {
    let app = TestApp::new();
    let event_id = create_event(&app).await;

    let (status, list) = app
        .organizer_request(Method::GET, "/api/v1/events", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let (status, _) = app
        .request_as(
            OrganizerId::new(),
            Method::GET,
            &format!("/api/v1/events/{event_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deactivated_event_closes_payment_page() {
    let app = TestApp::new();
    let event_id = create_event(&app).await;
    let (status, event) = app
        .organizer_request(
            Method::PUT,
            &format!("/api/v1/events/{event_id}"),
            Some(json!({"is_active": false})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = str_field(&event, "payment_token");

    let (status, _) = app
        .request(Method::GET, &format!("/api/v1/pay/{token}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn manual_confirmation_locks_the_row() {
    let app = TestApp::new();
    let event_id = create_event(&app).await;

    let (status, entry) = app
        .organizer_request(
            Method::POST,
            &format!("/api/v1/events/{event_id}/participants"),
            Some(json!({"email": "cash@example.com", "name": "Mika", "skip_auth": true})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{entry}");
    assert_eq!(entry.get("is_authenticated"), Some(&Value::Bool(true)));
    let status_id = str_field(&entry, "id");

    let (status, _) = app
        .organizer_request(
            Method::POST,
            &format!("/api/v1/events/{event_id}/participants"),
            Some(json!({"email": "cash@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let payment_uri = format!("/api/v1/events/{event_id}/payments/{status_id}");
    let (status, paid) = app
        .organizer_request(Method::PATCH, &payment_uri, Some(json!({"status": "PAID"})))
        .await;
    assert_eq!(status, StatusCode::OK, "{paid}");
    assert_eq!(paid.get("status"), Some(&json!("PAID")));

    let completions = app
        .mailer
        .sent()
        .await
        .iter()
        .filter(|m| m.subject == "Payment Completed: Board Games Night")
        .count();
    assert_eq!(completions, 1);

    let (status, _) = app
        .organizer_request(Method::PATCH, &payment_uri, Some(json!({"status": "UNPAID"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app
        .organizer_request(Method::PATCH, &payment_uri, Some(json!({"amount": 1})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app
        .organizer_request(Method::DELETE, &payment_uri, None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, board) = app
        .organizer_request(Method::GET, &format!("/api/v1/events/{event_id}/payments"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let Some(first) = board.as_array().and_then(|b| b.first()) else {
        panic!("one board entry expected");
    };
    assert_eq!(first.get("email"), Some(&json!("cash@example.com")));
    assert_eq!(first.get("status"), Some(&json!("PAID")));
}

#[tokio::test]
async fn unpaid_row_can_be_deleted() {
    let app = TestApp::new();
    let event_id = create_event(&app).await;
    let (_, entry) = app
        .organizer_request(
            Method::POST,
            &format!("/api/v1/events/{event_id}/participants"),
            Some(json!({"email": "gone@example.com"})),
        )
        .await;
    let status_id = str_field(&entry, "id");

    let (status, _) = app
        .organizer_request(
            Method::DELETE,
            &format!("/api/v1/events/{event_id}/payments/{status_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn config_secret_is_kept_and_never_returned() {
    let app = TestApp::new();
    let (status, created) = app
        .organizer_request(
            Method::POST,
            "/api/v1/payment-configs",
            Some(json!({
                "payment_method": "PAYPAY",
                "name": "PayPay",
                "paypay": {"api_key": "key", "api_secret": "s3cret", "merchant_id": "m-1"}
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = str_field(&created, "id");

    let (status, updated) = app
        .organizer_request(
            Method::PUT,
            &format!("/api/v1/payment-configs/{id}"),
            Some(json!({
                "payment_method": "PAYPAY",
                "name": "PayPay QR",
                "paypay": {"api_key": "key", "api_secret": "", "merchant_id": "m-1"}
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated.get("has_api_secret"), Some(&Value::Bool(true)));
    assert_eq!(updated.get("name"), Some(&json!("PayPay QR")));
    assert!(!updated.to_string().contains("s3cret"));

    let (status, _) = app
        .organizer_request(Method::DELETE, &format!("/api/v1/payment-configs/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, list) = app
        .organizer_request(Method::GET, "/api/v1/payment-configs", None)
        .await;
    assert_eq!(list.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn default_payment_configs_apply_to_new_events() {
    let app = TestApp::new();
    let (status, bank) = app
        .organizer_request(
            Method::POST,
            "/api/v1/payment-configs",
            Some(json!({
                "payment_method": "BANK",
                "name": "Bank transfer",
                "bank": {
                    "bank_name": "Example Bank",
                    "branch_name": "Main",
                    "account_type": "ordinary",
                    "account_number": "7654321",
                    "account_holder": "Organizer"
                }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{bank}");
    let bank_id = str_field(&bank, "id");

    let (status, _) = app
        .organizer_request(
            Method::PUT,
            "/api/v1/settings",
            Some(json!({"default_payment_config_ids": [PaymentConfigId::new().to_string()]})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, settings) = app
        .organizer_request(
            Method::PUT,
            "/api/v1/settings",
            Some(json!({"default_payment_config_ids": [bank_id]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{settings}");
    let (_, settings) = app
        .organizer_request(Method::GET, "/api/v1/settings", None)
        .await;
    assert_eq!(settings.get("default_payment_config_ids"), Some(&json!([bank_id])));

    let (status, event) = app
        .organizer_request(
            Method::POST,
            "/api/v1/events",
            Some(json!({"name": "Picnic", "base_amount": 500})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{event}");
    assert_eq!(event.get("payment_config_ids"), Some(&json!([bank_id])));
    assert_eq!(event.get("cash_enabled"), Some(&Value::Bool(true)));
}

#[tokio::test]
async fn system_endpoints_respond() {
    let app = TestApp::new();
    let (status, health) = app.request(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health.get("status"), Some(&json!("healthy")));

    let (status, methods) = app
        .request(Method::GET, "/config/payment-methods", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(methods.as_array().map(Vec::len), Some(5));
}
