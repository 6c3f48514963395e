pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Generation API
        .route("/api/v1/generate/cv", post(handlers::handle_generate_cv))
        .route(
            "/api/v1/generate/cover-letter",
            post(handlers::handle_generate_cover_letter),
        )
        .route("/api/v1/artifacts/:id", get(handlers::handle_get_artifact))
        // Safety preview API
        .route("/api/v1/safety/sanitize", post(handlers::handle_sanitize))
        .route("/api/v1/safety/bias", post(handlers::handle_bias))
        .with_state(state)
}
