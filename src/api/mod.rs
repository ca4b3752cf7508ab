//! API routes

pub mod connect;
pub mod health;
pub mod webhook;

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the service router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/connect", get(connect::connect))
        .route("/callback", get(connect::callback))
        .route("/status", get(connect::status))
        .route("/disconnect", delete(connect::disconnect))
        .route("/webhooks", post(webhook::handle_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
