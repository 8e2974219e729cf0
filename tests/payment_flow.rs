//! End-to-end participant flow through the HTTP router: verification,
//! idempotent charge submission, webhook settlement and the PAID lock.

#![allow(clippy::panic)]

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use common::{TestApp, str_field, verification_token};

/// Creates a PayPay config and an event priced 3000 with a +500 option.
async fn seed_event(app: &TestApp) -> String {
    let (status, config) = app
        .organizer_request(
            Method::POST,
            "/api/v1/payment-configs",
            Some(json!({
                "payment_method": "PAYPAY",
                "name": "PayPay",
                "paypay": {"api_key": "key", "api_secret": "secret", "merchant_id": "m-1"}
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{config}");
    let config_id = str_field(&config, "id");

    let (status, event) = app
        .organizer_request(
            Method::POST,
            "/api/v1/events",
            Some(json!({
                "name": "Summer BBQ",
                "base_amount": 3000,
                "conditions": [{
                    "id": "meal",
                    "label": "Meal",
                    "type": "radio",
                    "options": [
                        {"value": "A", "label": "Standard", "price_modifier": 0},
                        {"value": "B", "label": "Premium", "price_modifier": 500}
                    ]
                }],
                "payment_config_ids": [config_id]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{event}");
    str_field(&event, "payment_token")
}

/// Runs the verification round trip and returns the participant id.
async fn verify(app: &TestApp, token: &str, email: &str) -> String {
    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/pay/{token}/auth"),
            Some(json!({"email": email})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body.get("authenticated"), Some(&Value::Bool(false)));

    let sent = app.mailer.sent().await;
    let Some(mail) = sent.iter().rev().find(|m| m.subject == "Email Verification") else {
        panic!("verification mail expected");
    };
    let Some(auth_token) = verification_token(&mail.body) else {
        panic!("token in verification link");
    };

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/pay/{token}/verify?token={auth_token}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    str_field(&body, "participant_id")
}

#[tokio::test]
async fn event_page_lists_enabled_methods() {
    let app = TestApp::new();
    let token = seed_event(&app).await;

    let (status, body) = app
        .request(Method::GET, &format!("/api/v1/pay/{token}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.get("base_amount"), Some(&json!(3000)));
    let Some(options) = body.get("payment_options").and_then(Value::as_array) else {
        panic!("payment options expected");
    };
    let methods: Vec<&str> = options
        .iter()
        .filter_map(|o| o.get("payment_method").and_then(Value::as_str))
        .collect();
    assert_eq!(methods, vec!["PAYPAY", "CASH"]);
}

#[tokio::test]
async fn charge_is_idempotent_and_settles_once() {
    let app = TestApp::new();
    let token = seed_event(&app).await;
    let participant_id = verify(&app, &token, "guest@example.com").await;

    let (status, page) = app
        .request(Method::GET, &format!("/api/v1/pay/{token}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let Some(config_id) = page
        .get("payment_options")
        .and_then(Value::as_array)
        .and_then(|o| o.first())
        .and_then(|o| o.get("payment_config_id"))
        .cloned()
    else {
        panic!("paypay option expected");
    };

    let submission = json!({
        "participant_id": participant_id,
        "name": "Aiko",
        "selected_conditions": {"meal": "B"},
        "payment_method": "PAYPAY",
        "payment_config_id": config_id
    });
    let submit_uri = format!("/api/v1/pay/{token}/submit");

    let (status, first) = app
        .request(Method::POST, &submit_uri, Some(submission.clone()))
        .await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first.get("amount"), Some(&json!(3500)));
    assert_eq!(first.get("existing_payment"), Some(&Value::Bool(false)));
    let handle = str_field(&first, "charge_handle");

    let (status, second) = app
        .request(Method::POST, &submit_uri, Some(submission.clone()))
        .await;
    assert_eq!(status, StatusCode::OK, "{second}");
    assert_eq!(second.get("existing_payment"), Some(&Value::Bool(true)));
    assert_eq!(str_field(&second, "charge_handle"), handle);
    assert_eq!(second.get("payment_url"), first.get("payment_url"));
    assert_eq!(app.provider.create_calls(), 1);

    let notification = json!({
        "notification_type": "Transaction",
        "merchant_payment_id": handle,
        "state": "COMPLETED"
    });
    let (status, ack) = app
        .request(Method::POST, "/api/v1/webhooks/paypay", Some(notification.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack.get("applied"), Some(&Value::Bool(true)));

    let (status, ack) = app
        .request(Method::POST, "/api/v1/webhooks/paypay", Some(notification))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack.get("applied"), Some(&Value::Bool(false)));

    let completions = app
        .mailer
        .sent()
        .await
        .iter()
        .filter(|m| m.subject == "Payment Completed: Summer BBQ")
        .count();
    assert_eq!(completions, 1);

    let (status, view) = app
        .request(
            Method::GET,
            &format!("/api/v1/pay/{token}/participants/{participant_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let Some(state) = view
        .get("payment_status")
        .and_then(|s| s.get("status"))
        .and_then(Value::as_str)
    else {
        panic!("payment status expected");
    };
    assert_eq!(state, "PAID");

    let (status, body) = app.request(Method::POST, &submit_uri, Some(submission)).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let failed = json!({"merchant_payment_id": handle, "state": "FAILED"});
    let (status, _) = app
        .request(Method::POST, "/api/v1/webhooks/paypay", Some(failed))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, view) = app
        .request(
            Method::GET,
            &format!("/api/v1/pay/{token}/participants/{participant_id}"),
            None,
        )
        .await;
    assert_eq!(
        view.get("payment_status").and_then(|s| s.get("status")),
        Some(&json!("PAID"))
    );
}

#[tokio::test]
async fn bank_without_config_is_rejected() {
    let app = TestApp::new();
    let token = seed_event(&app).await;
    let participant_id = verify(&app, &token, "bank@example.com").await;

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/pay/{token}/submit"),
            Some(json!({
                "participant_id": participant_id,
                "name": "Ken",
                "payment_method": "BANK"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(app.provider.create_calls(), 0);
}

#[tokio::test]
async fn unknown_participant_cannot_submit() {
    let app = TestApp::new();
    let token = seed_event(&app).await;
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/pay/{token}/auth"),
            Some(json!({"email": "pending@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/pay/{token}/submit"),
            Some(json!({
                "participant_id": paylink_gateway::domain::ParticipantId::new(),
                "name": "Nobody",
                "payment_method": "CASH"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
}

#[tokio::test]
async fn unknown_webhook_reference_is_acknowledged() {
    let app = TestApp::new();
    let (status, ack) = app
        .request(
            Method::POST,
            "/api/v1/webhooks/paypay",
            Some(json!({"merchant_payment_id": "nope", "state": "COMPLETED"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack.get("applied"), Some(&Value::Bool(false)));

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/webhooks/paypay",
            Some(json!({"state": "COMPLETED"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_event_page_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app
        .request(Method::GET, "/api/v1/pay/does-not-exist", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body.get("error").and_then(|e| e.get("code")),
        Some(&json!(2001))
    );
}
