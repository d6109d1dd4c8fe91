use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use notification_cell::router::notification_routes;
use payment_cell::router::payment_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .nest("/appointment", appointment_routes(state.clone()))
        .nest("/payment", payment_routes(state.clone()))
        .nest("/notification", notification_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use shared_utils::test_utils::TestConfig;
    use tower::ServiceExt;

    async fn status_of(uri: &str, verb: &str) -> StatusCode {
        let request = Request::builder().method(verb).uri(uri).body(Body::empty()).unwrap();
        create_router(TestConfig::default().to_arc())
            .oneshot(request)
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn root_reports_liveness() {
        assert_eq!(status_of("/", "GET").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn cells_are_mounted_behind_auth() {
        assert_eq!(status_of("/appointment/getappointments", "GET").await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_of("/payment/transactions", "GET").await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_of("/notification/getallnotifs", "GET").await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn webhook_is_reachable_without_token() {
        // Rejected for the missing signature, not for the missing bearer token.
        assert_eq!(status_of("/payment/webhook", "POST").await, StatusCode::BAD_REQUEST);
    }
}
