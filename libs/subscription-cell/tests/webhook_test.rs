use axum::extract::State;
use axum::http::HeaderMap;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_models::error::AppError;
use shared_utils::test_utils::{StripeTestUtils, TestConfig};
use subscription_cell::handlers::stripe_webhook;
use subscription_cell::services::StripeClient;

fn signed_headers(payload: &str, secret: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let signature = StripeTestUtils::sign_payload(payload, secret, Utc::now().timestamp());
    headers.insert("Stripe-Signature", signature.parse().unwrap());
    headers
}

#[tokio::test]
async fn checkout_completed_upserts_the_clinic_subscription() {
    let mock_server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/subscriptions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "clinic_id": clinic_id,
            "status": "active"
        }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let test_config = TestConfig::with_supabase_url(&mock_server.uri());
    let payload = json!({
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_test_123",
                "customer": "cus_test123",
                "subscription": "sub_test123",
                "metadata": { "clinic_id": clinic_id }
            }
        }
    })
    .to_string();

    let headers = signed_headers(&payload, &test_config.stripe_webhook_secret);

    let result = stripe_webhook(State(test_config.to_arc()), headers, payload).await;

    let axum::Json(body) = result.expect("webhook should be accepted");
    assert_eq!(body["received"], json!(true));
}

#[tokio::test]
async fn unsigned_deliveries_are_rejected_before_any_parse() {
    let test_config = TestConfig::default();
    let payload = json!({ "type": "checkout.session.completed" }).to_string();

    let mut headers = HeaderMap::new();
    headers.insert("Stripe-Signature", "t=0,v1=deadbeef".parse().unwrap());

    let result = stripe_webhook(State(test_config.to_arc()), headers, payload).await;

    assert!(matches!(result, Err(AppError::Auth(_))));
}

#[tokio::test]
async fn unknown_event_types_are_acknowledged() {
    let test_config = TestConfig::default();
    let payload = json!({
        "type": "customer.created",
        "data": { "object": {} }
    })
    .to_string();

    let headers = signed_headers(&payload, &test_config.stripe_webhook_secret);

    let result = stripe_webhook(State(test_config.to_arc()), headers, payload).await;

    let axum::Json(body) = result.expect("unknown events are acknowledged");
    assert_eq!(body["received"], json!(true));
}

#[tokio::test]
async fn checkout_session_creation_returns_the_redirect_url() {
    let mock_server = MockServer::start().await;
    let clinic_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_123",
            "url": "https://checkout.stripe.com/c/pay/cs_test_123"
        })))
        .mount(&mock_server)
        .await;

    let config = TestConfig::default().to_app_config();
    let stripe = StripeClient::with_base_url(&config, &mock_server.uri());

    let session = stripe
        .create_checkout_session(
            clinic_id,
            "price_123",
            "https://clinic.example/success",
            "https://clinic.example/cancel",
        )
        .await
        .expect("checkout session should be created");

    assert_eq!(session.session_id, "cs_test_123");
    assert!(session.url.contains("checkout.stripe.com"));
}
