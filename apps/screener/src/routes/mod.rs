pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::screening::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Screening sessions
        .route(
            "/api/v1/screening/sessions",
            post(handlers::handle_create_session),
        )
        .route(
            "/api/v1/screening/sessions/:id",
            get(handlers::handle_get_session),
        )
        .route(
            "/api/v1/screening/sessions/:id/run",
            post(handlers::handle_run_session),
        )
        .route(
            "/api/v1/screening/sessions/:id/cancel",
            post(handlers::handle_cancel_session),
        )
        .route(
            "/api/v1/screening/sessions/:id/results",
            get(handlers::handle_session_results),
        )
        .route(
            "/api/v1/screening/sessions/:id/summary",
            get(handlers::handle_session_summary),
        )
        // Individual evaluations
        .route(
            "/api/v1/screening/results/:id",
            get(handlers::handle_get_result),
        )
        .route(
            "/api/v1/screening/results/:id/retry",
            post(handlers::handle_retry_result),
        )
        .route("/api/v1/screening/score", post(handlers::handle_score_one))
        // Job configuration
        .route("/api/v1/jobs/:id/weights", put(handlers::handle_update_weights))
        .with_state(state)
}
