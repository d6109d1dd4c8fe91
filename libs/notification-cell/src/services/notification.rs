use std::sync::Arc;

use futures::future::join_all;
use serde_json::json;
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{NewNotification, Notification, NotificationError};

pub struct NotificationService {
    supabase: Arc<SupabaseClient>,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn create(&self, notification: NewNotification) -> Result<Notification, NotificationError> {
        debug!("Creating notification for {}", notification.recipient);

        let row = json!({
            "user_id": notification.recipient,
            "content": notification.content
        });

        Ok(self.supabase.insert("notifications", row).await?)
    }

    /// Writes every notification concurrently. Failures are logged and returned
    /// per item; one failed write never affects the others.
    pub async fn deliver_all(
        &self,
        notifications: Vec<NewNotification>,
    ) -> Vec<Result<Notification, NotificationError>> {
        let recipients: Vec<Uuid> = notifications.iter().map(|n| n.recipient).collect();
        let results = join_all(notifications.into_iter().map(|n| self.create(n))).await;

        for (recipient, result) in recipients.iter().zip(&results) {
            if let Err(e) = result {
                error!("Failed to store notification for {}: {}", recipient, e);
            }
        }

        results
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, NotificationError> {
        let query = format!("user_id=eq.{}&order=created_at.desc", user_id);
        Ok(self.supabase.select("notifications", &query).await?)
    }
}
