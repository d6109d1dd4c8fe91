use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_models::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient: Uuid,
    pub content: String,
}

impl NewNotification {
    pub fn new(recipient: Uuid, content: impl Into<String>) -> Self {
        Self { recipient, content: content.into() }
    }
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::DatabaseError(e) => AppError::Database(e.to_string()),
        }
    }
}
