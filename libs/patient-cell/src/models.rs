use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::error::AppError;

/// Columns read back from the `users` table. The password hash is never selected.
pub const USER_COLUMNS: &str = "id,firstname,lastname,email,is_doctor,created_at";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub id: Uuid,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    #[serde(default)]
    pub is_doctor: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

/// Identity fields a receptionist collects at the front desk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewPatient {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password: String,
}

impl NewPatient {
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

#[derive(Debug, Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Patient with email {email} already exists")]
    EmailAlreadyExists { email: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppError::NotFound("User not found".to_string()),
            PatientError::EmailAlreadyExists { .. } => AppError::Conflict(err.to_string()),
            PatientError::ValidationError(msg) => AppError::ValidationError(msg),
            PatientError::PasswordHash(msg) => AppError::Internal(msg),
            PatientError::DatabaseError(e) => AppError::Database(e.to_string()),
        }
    }
}
