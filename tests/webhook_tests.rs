mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{create_request, harness, FakeGateway, TestHarness};
use payment_engine::api::{create_router, AppState, WebhookContext};
use payment_engine::gateway::signature::{self, NotificationPayload};
use payment_engine::models::PaymentStatus;
use tower::ServiceExt;

const SECRET: &str = "test-webhook-secret";

fn app_state(h: &TestHarness) -> AppState {
    AppState::new(
        h.service.clone(),
        WebhookContext {
            secret_key: SECRET.to_string(),
            signature_header: "x-token".to_string(),
        },
    )
}

fn notification_for(reference: &str) -> (String, NotificationPayload) {
    let body = format!(
        "cpm_trans_id={reference}&cpm_site_id=123456&cpm_amount=5000&cpm_currency=XAF"
    );
    let payload = NotificationPayload {
        cpm_trans_id: reference.to_string(),
        cpm_site_id: "123456".to_string(),
        cpm_amount: "5000".to_string(),
        cpm_currency: "XAF".to_string(),
        ..Default::default()
    };
    (body, payload)
}

fn notification_request(body: String, token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/payments/notification")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-token", token)
        .body(Body::from(body))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_valid_webhook_resolves_payment() {
    let h = harness(FakeGateway::accepting(), 20);
    let app = create_router(app_state(&h));

    let record = h
        .service
        .create_payment(create_request(42, 7, 5000))
        .await
        .unwrap();
    let reference = record.external_reference.clone();

    let (body, payload) = notification_for(&reference);
    let token = signature::compute_token(&payload, SECRET);

    let response = app
        .clone()
        .oneshot(notification_request(body.clone(), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["data"]["status"], "ACCEPTED");
    assert_eq!(h.store.status_of(&reference), Some(PaymentStatus::Accepted));
    assert!(h.queue.entry(&reference).is_none());

    // Gateways retry deliveries; the duplicate is acknowledged and
    // changes nothing.
    let response = app
        .oneshot(notification_request(body, &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.store.status_of(&reference), Some(PaymentStatus::Accepted));
    assert_eq!(h.gateway.verify_calls(), 2);
}

#[tokio::test]
async fn test_tampered_signature_never_mutates() {
    let h = harness(FakeGateway::accepting(), 20);
    let app = create_router(app_state(&h));

    let record = h
        .service
        .create_payment(create_request(42, 7, 5000))
        .await
        .unwrap();
    let reference = record.external_reference.clone();

    // Token computed over a different amount than the delivered body.
    let (_, payload) = notification_for(&reference);
    let token = signature::compute_token(&payload, SECRET);
    let tampered_body = format!(
        "cpm_trans_id={reference}&cpm_site_id=123456&cpm_amount=9999999&cpm_currency=XAF"
    );

    let response = app
        .oneshot(notification_request(tampered_body, &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // No ledger mutation, no gateway call, queue entry untouched.
    assert_eq!(h.store.status_of(&reference), Some(PaymentStatus::Pending));
    assert_eq!(h.gateway.verify_calls(), 0);
    assert!(h.queue.entry(&reference).is_some());
}

#[tokio::test]
async fn test_wrong_secret_rejected() {
    let h = harness(FakeGateway::accepting(), 20);
    let app = create_router(app_state(&h));

    let record = h
        .service
        .create_payment(create_request(42, 7, 5000))
        .await
        .unwrap();
    let reference = record.external_reference.clone();

    let (body, payload) = notification_for(&reference);
    let token = signature::compute_token(&payload, "attacker-guess");

    let response = app
        .oneshot(notification_request(body, &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.store.status_of(&reference), Some(PaymentStatus::Pending));
}

#[tokio::test]
async fn test_missing_signature_header_rejected() {
    let h = harness(FakeGateway::accepting(), 20);
    let app = create_router(app_state(&h));

    let record = h
        .service
        .create_payment(create_request(42, 7, 5000))
        .await
        .unwrap();
    let reference = record.external_reference.clone();

    let (body, _) = notification_for(&reference);
    let request = Request::builder()
        .method("POST")
        .uri("/payments/notification")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.store.status_of(&reference), Some(PaymentStatus::Pending));
}

#[tokio::test]
async fn test_authenticated_webhook_for_unknown_reference() {
    let h = harness(FakeGateway::accepting(), 20);
    let app = create_router(app_state(&h));

    let (body, payload) = notification_for("CINETPAY_1_1_19700101000000000");
    let token = signature::compute_token(&payload, SECRET);

    let response = app
        .oneshot(notification_request(body, &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_webhook_with_gateway_down_acknowledges_without_action() {
    let h = harness(FakeGateway::accepting(), 20);
    let app = create_router(app_state(&h));

    let record = h
        .service
        .create_payment(create_request(42, 7, 5000))
        .await
        .unwrap();
    let reference = record.external_reference.clone();

    h.gateway.set_verify(common::VerifyBehavior::Unavailable);

    let (body, payload) = notification_for(&reference);
    let token = signature::compute_token(&payload, SECRET);

    // 200 so the gateway stops retrying aggressively; no mutation, and
    // the worker's queue entry still covers the payment.
    let response = app
        .oneshot(notification_request(body, &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert!(json["data"]["status"].is_null());
    assert_eq!(h.store.status_of(&reference), Some(PaymentStatus::Pending));
    assert!(h.queue.entry(&reference).is_some());
}
