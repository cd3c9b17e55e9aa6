//! Route definitions

use crate::{handlers, openapi, AppState};
use axum::{
    routing::{get, patch, post, put},
    Json, Router,
};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Authentication
        .route("/auth/otp", post(handlers::request_otp))
        .route("/auth/verify", post(handlers::verify_otp))
        .route("/auth/me", get(handlers::me))
        .route("/auth/logout", post(handlers::logout))
        // Profile and directory
        .route("/profile", put(handlers::update_profile))
        .route("/masters", get(handlers::list_masters))
        .route("/masters/{id}", get(handlers::get_master))
        // Service requests
        .route(
            "/requests",
            post(handlers::create_request).get(handlers::list_requests),
        )
        .route("/requests/{id}", get(handlers::get_request))
        .route("/requests/{id}/status", patch(handlers::set_status))
        // Documentation
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(openapi::api_doc()) }),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AppState, WebConfig};
    use axum::http::StatusCode;
    use std::sync::Arc;
    use tower::ServiceExt;
    use usta_applications::UstaApplication;

    #[tokio::test]
    async fn test_health_check_route() {
        let application = UstaApplication::in_memory(Default::default())
            .await
            .unwrap();
        let state = AppState::with_application(WebConfig::default(), Arc::new(application));
        let app = api_routes().with_state(state);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
