use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use payment_cell::{PaymentError, PaymentProof, PaymentService};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn service_for(server: &MockServer) -> PaymentService {
    PaymentService::new(&TestConfig::with_mock_uri(&server.uri()).to_app_config())
}

fn proof(tx: &str, amount: f64) -> PaymentProof {
    PaymentProof { transaction_id: tx.to_string(), amount }
}

async fn mount_intent(server: &MockServer, id: &str, status: &str, cents: i64) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/payment_intents/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockSupabaseResponses::payment_intent_response(id, status, cents),
        ))
        .mount(server)
        .await;
}

async fn mount_no_payment(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn settled_intent_with_matching_amount_is_accepted() {
    let server = MockServer::start().await;
    mount_intent(&server, "pi_ok", "succeeded", 1000).await;
    mount_no_payment(&server).await;

    let intent = service_for(&server)
        .verify_settlement(&proof("pi_ok", 2780.0))
        .await
        .unwrap();

    assert_eq!(intent.id, "pi_ok");
    assert!(intent.is_succeeded());
}

#[tokio::test]
async fn unsettled_intent_is_rejected() {
    let server = MockServer::start().await;
    mount_intent(&server, "pi_pending", "requires_payment_method", 1000).await;

    let result = service_for(&server).verify_settlement(&proof("pi_pending", 2780.0)).await;

    assert_matches!(result, Err(PaymentError::NotSettled { status, .. }) if status == "requires_payment_method");
}

#[tokio::test]
async fn charged_amount_must_match_claim() {
    let server = MockServer::start().await;
    mount_intent(&server, "pi_cheap", "succeeded", 1).await;

    let result = service_for(&server).verify_settlement(&proof("pi_cheap", 2780.0)).await;

    assert_matches!(result, Err(PaymentError::AmountMismatch { expected: 1000, charged: 1 }));
}

#[tokio::test]
async fn unknown_intent_maps_to_payment_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payment_intents/pi_ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "resource_missing", "message": "No such payment_intent" }
        })))
        .mount(&server)
        .await;

    let result = service_for(&server).verify_settlement(&proof("pi_ghost", 2780.0)).await;

    assert_matches!(result, Err(PaymentError::UnknownIntent { transaction_id }) if transaction_id == "pi_ghost");
}

#[tokio::test]
async fn transaction_id_cannot_be_reused() {
    let server = MockServer::start().await;
    mount_intent(&server, "pi_used", "succeeded", 1000).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .and(query_param("transaction_id", "eq.pi_used"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::payment_response("pi_used", &uuid::Uuid::new_v4().to_string(), &uuid::Uuid::new_v4().to_string(), 2780.0, "completed")
        ])))
        .mount(&server)
        .await;

    let result = service_for(&server).verify_settlement(&proof("pi_used", 2780.0)).await;

    assert_matches!(result, Err(PaymentError::AlreadyRecorded(tx)) if tx == "pi_used");
}

#[tokio::test]
async fn gateway_is_not_called_without_secret_key() {
    let server = MockServer::start().await;
    let mut config = TestConfig::with_mock_uri(&server.uri()).to_app_config();
    config.stripe_secret_key.clear();

    let result = PaymentService::new(&config).verify_settlement(&proof("pi_any", 2780.0)).await;

    assert_matches!(result, Err(PaymentError::NotConfigured));
}
