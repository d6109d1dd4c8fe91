use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn payment_routes(state: Arc<AppConfig>) -> Router {
    let protected = Router::new()
        .route("/create-payment-intent", post(handlers::create_payment_intent))
        .route("/transactions", get(handlers::list_transactions))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // The gateway signs its callbacks; no bearer token.
    Router::new()
        .route("/webhook", post(handlers::payment_webhook))
        .merge(protected)
        .with_state(state)
}
