use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    Json,
};
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreatePaymentIntentRequest, CreatePaymentIntentResponse, Payment, PaymentError};
use crate::services::payment::PaymentService;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[axum::debug_handler]
pub async fn create_payment_intent(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePaymentIntentRequest>,
) -> Result<Json<CreatePaymentIntentResponse>, AppError> {
    let response = PaymentService::new(&state)
        .initiate_payment(&user.id, &request)
        .await?;

    Ok(Json(response))
}

/// Gateway callback. Takes the raw body since the signature covers the exact bytes.
#[axum::debug_handler]
pub async fn payment_webhook(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            warn!("Webhook call without {} header", SIGNATURE_HEADER);
            AppError::from(PaymentError::InvalidSignature("missing signature header".to_string()))
        })?;

    let outcome = PaymentService::new(&state)
        .apply_webhook(&body, signature)
        .await?;
    debug!("Webhook handled: {:?}", outcome);

    Ok(Json(json!({ "received": true })))
}

#[axum::debug_handler]
pub async fn list_transactions(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_super_admin {
        return Err(AppError::Forbidden("Only super admins can view transactions".to_string()));
    }

    let payments: Vec<Payment> = PaymentService::new(&state).list_transactions().await?;

    Ok(Json(json!({
        "success": true,
        "count": payments.len(),
        "data": payments
    })))
}
