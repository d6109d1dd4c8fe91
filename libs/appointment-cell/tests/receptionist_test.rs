use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::router::appointment_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn walk_in_body(doctor_id: Uuid) -> Value {
    json!({
        "firstname": "Sara",
        "lastname": "Ali",
        "email": "Sara@Example.com",
        "password": "walk-in-pass",
        "doctorId": doctor_id,
        "doctorname": "Ayesha Khan",
        "date": "2025-03-10",
        "time": "11:00"
    })
}

fn post_as(user: &TestUser, config: &TestConfig, body: Value) -> Request<Body> {
    let token = JwtTestUtils::create_test_token(user, &config.jwt_secret, None);
    Request::builder()
        .method("POST")
        .uri("/book-by-receptionist")
        .header("Authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn mount_slot_probe(server: &MockServer, taken: &[&str]) {
    for time in taken {
        Mock::given(method("GET"))
            .and(path("/rest/v1/appointments"))
            .and(query_param("time", format!("eq.{}", time)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": Uuid::new_v4() }])))
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .with_priority(10)
        .mount(server)
        .await;
}

async fn mount_insert(server: &MockServer, patient: &str, doctor: Uuid, time: &str) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({ "time": time, "user_id": patient })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(patient, &doctor.to_string(), "2025-03-10", time, "Scheduled")
        ])))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_notifications(server: &MockServer, patient: &str) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/notifications"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::notification_response(patient, "stored")
        ])))
        .expect(2)
        .mount(server)
        .await;
}

#[tokio::test]
async fn receptionist_registers_new_patient_and_books() {
    let server = MockServer::start().await;
    let config = TestConfig::with_mock_uri(&server.uri());
    let doctor = Uuid::new_v4();
    let patient = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.sara@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::user_response(&patient, "Sara", "Ali", "sara@example.com")
        ])))
        .expect(1)
        .mount(&server)
        .await;
    mount_slot_probe(&server, &[]).await;
    mount_insert(&server, &patient, doctor, "11:00").await;
    mount_notifications(&server, &patient).await;

    let desk = TestUser::receptionist("desk@clinic.example.com");
    let response = appointment_routes(config.to_arc())
        .oneshot(post_as(&desk, &config, walk_in_body(doctor)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Appointment booked successfully");
    assert_eq!(body["data"]["time"], "11:00");
    assert_eq!(body["data"]["isAlternativeSlot"], false);

    let requests = server.received_requests().await.unwrap();
    let created_user: Value = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == "/rest/v1/users")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .unwrap();
    assert_eq!(created_user["email"], "sara@example.com");
    assert!(created_user["password"].as_str().unwrap().starts_with("$argon2"));
    assert_eq!(created_user["is_doctor"], false);
}

#[tokio::test]
async fn existing_patient_is_reused_and_shift_reaches_both_notices() {
    let server = MockServer::start().await;
    let config = TestConfig::with_mock_uri(&server.uri());
    let doctor = Uuid::new_v4();
    let patient = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.sara@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_response(&patient, "Sara", "Ali", "sara@example.com")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    mount_slot_probe(&server, &["11:00"]).await;
    mount_insert(&server, &patient, doctor, "11:05").await;
    mount_notifications(&server, &patient).await;

    let admin = TestUser::admin("admin@clinic.example.com");
    let response = appointment_routes(config.to_arc())
        .oneshot(post_as(&admin, &config, walk_in_body(doctor)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["time"], "11:05");
    assert_eq!(data["isAlternativeSlot"], true);
    assert_eq!(data["originalRequestedTime"], "11:00");
    assert_eq!(data["timeAdjustmentMinutes"], 5);

    let notices: Vec<Value> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/rest/v1/notifications")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(notices.len(), 2);
    for notice in &notices {
        assert!(notice["content"]
            .as_str()
            .unwrap()
            .ends_with("(originally requested 11:00, moved by 5 minutes)"));
    }
}

#[tokio::test]
async fn notices_use_typed_names_and_stored_doctor_when_unnamed() {
    let server = MockServer::start().await;
    let config = TestConfig::with_mock_uri(&server.uri());
    let doctor = Uuid::new_v4();
    let patient = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.sara@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_response(&patient, "Sarah", "Ali-Khan", "sara@example.com")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", doctor)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_user_response(&doctor.to_string(), "Ayesha", "Khan")
        ])))
        .expect(1)
        .mount(&server)
        .await;
    mount_slot_probe(&server, &[]).await;
    mount_insert(&server, &patient, doctor, "11:00").await;
    mount_notifications(&server, &patient).await;

    let mut body = walk_in_body(doctor);
    body.as_object_mut().unwrap().remove("doctorname");

    let desk = TestUser::receptionist("desk@clinic.example.com");
    let response = appointment_routes(config.to_arc())
        .oneshot(post_as(&desk, &config, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let notices: Vec<Value> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/rest/v1/notifications")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    let to_patient = notices.iter().find(|n| n["user_id"] == json!(patient)).unwrap();
    assert_eq!(
        to_patient["content"],
        "You have an appointment with Dr. Ayesha Khan on 2025-03-10 at 11:00"
    );
    let to_doctor = notices.iter().find(|n| n["user_id"] == json!(doctor)).unwrap();
    assert_eq!(
        to_doctor["content"],
        "You have an appointment with Sara Ali on 2025-03-10 at 11:00"
    );
}

#[tokio::test]
async fn exhausted_window_fails_before_patient_lookup() {
    let server = MockServer::start().await;
    let config = TestConfig::with_mock_uri(&server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": Uuid::new_v4() }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let desk = TestUser::receptionist("desk@clinic.example.com");
    let response = appointment_routes(config.to_arc())
        .oneshot(post_as(&desk, &config, walk_in_body(Uuid::new_v4())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "slot_unavailable");
    assert_eq!(body["message"], "No available slots found between 11:00 and 11:55");
}

#[tokio::test]
async fn patients_cannot_use_front_desk_route() {
    let config = TestConfig::default();
    let patient = TestUser::patient("p@example.com");

    let response = appointment_routes(config.to_arc())
        .oneshot(post_as(&patient, &config, walk_in_body(Uuid::new_v4())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_fields_are_rejected() {
    let config = TestConfig::default();
    let desk = TestUser::receptionist("desk@clinic.example.com");
    let mut body = walk_in_body(Uuid::new_v4());
    body.as_object_mut().unwrap().remove("password");

    let response = appointment_routes(config.to_arc())
        .oneshot(post_as(&desk, &config, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "All fields are required");
}
