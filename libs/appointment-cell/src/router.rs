use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/bookappointment", post(handlers::book_appointment))
        .route("/book-by-receptionist", post(handlers::book_by_receptionist))
        .route("/completed", put(handlers::mark_completed))
        .route("/cancel", put(handlers::cancel_appointment))
        .route("/getappointments", get(handlers::get_appointments))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
