use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::error::AppError;

// ==============================================================================
// PAYMENT RECORDS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Payment {
    pub id: Uuid,
    pub transaction_id: String,
    pub amount: f64,
    pub doctor_id: Uuid,
    pub user_id: Uuid,
    pub status: PaymentStatus,
    pub date: NaiveDate,
    pub time: String,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_payment_method() -> String {
    "stripe".to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub transaction_id: String,
    pub amount: f64,
    pub doctor_id: Uuid,
    pub user_id: Uuid,
    pub status: PaymentStatus,
    pub date: NaiveDate,
    pub time: String,
}

/// Caller-supplied evidence that a gateway charge happened.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentProof {
    pub transaction_id: String,
    pub amount: f64,
}

// ==============================================================================
// GATEWAY MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    pub fn is_succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    StatusUpdated { transaction_id: String, status: PaymentStatus, matched: bool },
    Ignored { event_type: String },
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub amount: serde_json::Value,
    #[serde(default, alias = "doctorname")]
    pub doctor_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    pub success: bool,
    pub client_secret: Option<String>,
    pub payment_intent_id: String,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid payment intent id: {0}")]
    InvalidIntentId(String),

    #[error("Payment {transaction_id} has not settled (status: {status})")]
    NotSettled { transaction_id: String, status: String },

    #[error("Payment {transaction_id} was not found at the gateway")]
    UnknownIntent { transaction_id: String },

    #[error("Charged amount {charged} does not match expected {expected} (minor units)")]
    AmountMismatch { expected: i64, charged: i64 },

    #[error("Payment {0} has already been used for a booking")]
    AlreadyRecorded(String),

    #[error("Webhook signature verification failed: {0}")]
    InvalidSignature(String),

    #[error("Malformed webhook event: {0}")]
    MalformedEvent(String),

    #[error("Payment gateway is not configured")]
    NotConfigured,

    #[error("Payment gateway error ({status}): {message}")]
    Gateway { status: u16, message: String },

    #[error("Payment gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidAmount(msg) => AppError::ValidationError(msg),
            PaymentError::InvalidIntentId(_) => AppError::ValidationError(err.to_string()),
            PaymentError::NotSettled { .. }
            | PaymentError::UnknownIntent { .. }
            | PaymentError::AmountMismatch { .. } => AppError::PaymentRequired(err.to_string()),
            PaymentError::AlreadyRecorded(_) => AppError::Conflict(err.to_string()),
            PaymentError::InvalidSignature(_) | PaymentError::MalformedEvent(_) => {
                AppError::BadRequest(format!("Webhook Error: {}", err))
            }
            PaymentError::NotConfigured
            | PaymentError::Gateway { .. }
            | PaymentError::Transport(_) => AppError::ExternalService(err.to_string()),
            PaymentError::DatabaseError(e) => AppError::Database(e.to_string()),
        }
    }
}
