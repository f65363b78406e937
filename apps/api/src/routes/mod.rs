pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::reconcile::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Skills dictionary administration
        .route(
            "/api/v1/skills",
            get(handlers::handle_list_skills)
                .post(handlers::handle_add_skills)
                .delete(handlers::handle_remove_skills),
        )
        .route("/api/v1/skills/seed", post(handlers::handle_seed))
        .route("/api/v1/skills/audit", get(handlers::handle_audit))
        .route("/api/v1/skills/resync", post(handlers::handle_resync))
        // Reconciliation
        .route("/api/v1/skills/reconcile", post(handlers::handle_reconcile))
        .route(
            "/api/v1/candidates/normalize",
            post(handlers::handle_normalize_candidate),
        )
        .with_state(state)
}
