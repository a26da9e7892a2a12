pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::exploration::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Session lifecycle
        .route("/api/v1/:band/sessions", post(handlers::handle_start))
        .route(
            "/api/v1/:band/sessions/:id",
            delete(handlers::handle_delete_session),
        )
        // Questionnaire flow
        .route(
            "/api/v1/:band/sessions/:id/question",
            get(handlers::handle_get_question),
        )
        .route(
            "/api/v1/:band/sessions/:id/response",
            post(handlers::handle_submit_response),
        )
        .route(
            "/api/v1/:band/sessions/:id/choices/regenerate",
            post(handlers::handle_regenerate_choices),
        )
        // Recommendation + plan
        .route(
            "/api/v1/:band/sessions/:id/recommendation",
            post(handlers::handle_generate_recommendation),
        )
        .route(
            "/api/v1/:band/sessions/:id/confirm",
            post(handlers::handle_confirm_or_modify),
        )
        .route(
            "/api/v1/:band/sessions/:id/plan",
            post(handlers::handle_generate_plan),
        )
        // Export projection
        .route(
            "/api/v1/:band/sessions/:id/summary",
            get(handlers::handle_get_summary),
        )
        .with_state(state)
}
