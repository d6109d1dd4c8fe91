use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::Notification;
use crate::services::notification::NotificationService;

#[axum::debug_handler]
pub async fn get_all_notifications(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let user_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))?;

    let notifications = NotificationService::new(&state)
        .list_for_user(user_id)
        .await?;

    Ok(Json(notifications))
}
