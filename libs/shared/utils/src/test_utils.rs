use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, SlotSearchConfig};
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            stripe_secret_key: "sk_test_booking".to_string(),
            stripe_webhook_secret: "whsec_test_booking".to_string(),
            stripe_api_base_url: "http://localhost:12111".to_string(),
        }
    }
}

impl TestConfig {
    /// Points both the document store and the payment gateway at one mock server.
    pub fn with_mock_uri(uri: &str) -> Self {
        Self {
            supabase_url: uri.to_string(),
            stripe_api_base_url: uri.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            stripe_secret_key: self.stripe_secret_key.clone(),
            stripe_webhook_secret: self.stripe_webhook_secret.clone(),
            stripe_api_base_url: self.stripe_api_base_url.clone(),
            payment_exchange_rate: 278.0,
            slot_search: SlotSearchConfig::default(),
            port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestRole {
    Patient,
    Doctor,
    Receptionist,
    Admin,
    SuperAdmin,
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: TestRole,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", TestRole::Patient)
    }
}

impl TestUser {
    pub fn new(email: &str, role: TestRole) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, TestRole::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, TestRole::Patient)
    }

    pub fn receptionist(email: &str) -> Self {
        Self::new(email, TestRole::Receptionist)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, TestRole::Admin)
    }

    pub fn super_admin(email: &str) -> Self {
        Self::new(email, TestRole::SuperAdmin)
    }

    pub fn uuid(&self) -> Uuid {
        Uuid::parse_str(&self.id).expect("test user ids are uuids")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            is_admin: matches!(self.role, TestRole::Admin | TestRole::SuperAdmin),
            is_receptionist: self.role == TestRole::Receptionist,
            is_super_admin: self.role == TestRole::SuperAdmin,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));
        let claims = user.to_user();

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "userId": user.id,
            "email": user.email,
            "isAdmin": claims.is_admin,
            "isReceptionist": claims.is_receptionist,
            "isSuperAdmin": claims.is_super_admin,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST rows for the tables the booking core touches.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn user_response(user_id: &str, firstname: &str, lastname: &str, email: &str) -> serde_json::Value {
        json!({
            "id": user_id,
            "firstname": firstname,
            "lastname": lastname,
            "email": email,
            "is_doctor": false,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn doctor_user_response(user_id: &str, firstname: &str, lastname: &str) -> serde_json::Value {
        json!({
            "id": user_id,
            "firstname": firstname,
            "lastname": lastname,
            "email": format!("{}@clinic.example.com", firstname.to_lowercase()),
            "is_doctor": true,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(
        patient_id: &str,
        doctor_id: &str,
        date: &str,
        time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "date": date,
            "time": time,
            "doctor_id": doctor_id,
            "user_id": patient_id,
            "status": status,
            "has_feedback": false,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn payment_response(
        transaction_id: &str,
        patient_id: &str,
        doctor_id: &str,
        amount: f64,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "transaction_id": transaction_id,
            "amount": amount,
            "doctor_id": doctor_id,
            "user_id": patient_id,
            "status": status,
            "date": "2025-03-10",
            "time": "09:00",
            "payment_method": "stripe",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn notification_response(user_id: &str, content: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "content": content,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn payment_intent_response(intent_id: &str, status: &str, amount_cents: i64) -> serde_json::Value {
        json!({
            "id": intent_id,
            "object": "payment_intent",
            "amount": amount_cents,
            "currency": "usd",
            "status": status,
            "client_secret": format!("{}_secret_test", intent_id),
            "metadata": {}
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code,
            "details": null,
            "hint": null
        })
    }
}
