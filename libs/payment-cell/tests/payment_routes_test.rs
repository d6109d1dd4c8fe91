use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use payment_cell::router::payment_routes;
use payment_cell::services::webhook::sign;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn signed_webhook(config: &TestConfig, payload: &str) -> Request<Body> {
    let now = Utc::now().timestamp();
    let signature = sign(payload.as_bytes(), now, &config.stripe_webhook_secret).unwrap();

    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("stripe-signature", format!("t={},v1={}", now, signature))
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn succeeded_event_marks_payment_completed() {
    let server = MockServer::start().await;
    let config = TestConfig::with_mock_uri(&server.uri());

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/payments"))
        .and(query_param("transaction_id", "eq.pi_123"))
        .and(body_partial_json(json!({ "status": "completed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::payment_response("pi_123", &uuid::Uuid::new_v4().to_string(), &uuid::Uuid::new_v4().to_string(), 2780.0, "completed")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let payload = r#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_123"}}}"#;
    let response = payment_routes(config.to_arc())
        .oneshot(signed_webhook(&config, payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "received": true }));
}

#[tokio::test]
async fn failed_event_marks_payment_failed() {
    let server = MockServer::start().await;
    let config = TestConfig::with_mock_uri(&server.uri());

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/payments"))
        .and(body_partial_json(json!({ "status": "failed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let payload = r#"{"id":"evt_2","type":"payment_intent.payment_failed","data":{"object":{"id":"pi_9"}}}"#;
    let response = payment_routes(config.to_arc())
        .oneshot(signed_webhook(&config, payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn other_events_are_acknowledged_without_writes() {
    let server = MockServer::start().await;
    let config = TestConfig::with_mock_uri(&server.uri());

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let payload = r#"{"id":"evt_3","type":"charge.refunded","data":{"object":{"id":"ch_1"}}}"#;
    let response = payment_routes(config.to_arc())
        .oneshot(signed_webhook(&config, payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn bad_signature_is_rejected() {
    let config = TestConfig::default();
    let payload = r#"{"id":"evt_4","type":"payment_intent.succeeded","data":{"object":{"id":"pi_1"}}}"#;

    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("stripe-signature", format!("t={},v1=00ff", Utc::now().timestamp()))
        .body(Body::from(payload))
        .unwrap();

    let response = payment_routes(config.to_arc()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().starts_with("Webhook Error"));
}

#[tokio::test]
async fn create_payment_intent_converts_amount_and_tags_metadata() {
    let server = MockServer::start().await;
    let config = TestConfig::with_mock_uri(&server.uri());
    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);
    let doctor_id = uuid::Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .and(body_string_contains("amount=1000"))
        .and(body_string_contains("currency=usd"))
        .and(body_string_contains("originalAmountPKR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockSupabaseResponses::payment_intent_response("pi_new", "requires_payment_method", 1000),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/create-payment-intent")
        .header("Authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "doctorId": doctor_id,
                "date": "2025-03-10",
                "time": "09:00",
                "amount": 2780,
                "doctorname": "Ayesha Khan"
            })
            .to_string(),
        ))
        .unwrap();

    let response = payment_routes(config.to_arc()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["paymentIntentId"], "pi_new");
    assert_eq!(body["clientSecret"], "pi_new_secret_test");
    assert_eq!(body["time"], "09:00");
}

#[tokio::test]
async fn create_payment_intent_enforces_minimum() {
    let config = TestConfig::default();
    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);

    let request = Request::builder()
        .method("POST")
        .uri("/create-payment-intent")
        .header("Authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "doctorId": uuid::Uuid::new_v4(),
                "date": "2025-03-10",
                "time": "09:00",
                "amount": 1.5
            })
            .to_string(),
        ))
        .unwrap();

    let response = payment_routes(config.to_arc()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Minimum payment is Rs. 2.00");
}

#[tokio::test]
async fn transactions_require_super_admin() {
    let server = MockServer::start().await;
    let config = TestConfig::with_mock_uri(&server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::payment_response("pi_1", &uuid::Uuid::new_v4().to_string(), &uuid::Uuid::new_v4().to_string(), 2780.0, "completed")
        ])))
        .mount(&server)
        .await;

    for (user, expected) in [
        (TestUser::patient("p@example.com"), StatusCode::FORBIDDEN),
        (TestUser::admin("a@example.com"), StatusCode::FORBIDDEN),
        (TestUser::super_admin("s@example.com"), StatusCode::OK),
    ] {
        let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);
        let request = Request::builder()
            .uri("/transactions")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let response = payment_routes(config.to_arc()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), expected);
    }
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let request = Request::builder()
        .uri("/transactions")
        .body(Body::empty())
        .unwrap();

    let response = payment_routes(TestConfig::default().to_arc()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
