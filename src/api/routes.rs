//! Route Definitions

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/resolve-game", post(resolve_game_handler))
        // Read-only contract views
        .route("/games/:game_id", get(game_details_handler))
        .route("/users/:address/stats", get(user_stats_handler))
        .route("/stats", get(contract_stats_handler))
        .with_state(state)
}
