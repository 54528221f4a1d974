//! REST API endpoints for the gateway

pub mod accounts;
pub mod health;

use axum::{
    routing::{get, put},
    Router,
};
use std::sync::Arc;

use crate::state::GatewayState;

/// Create all REST API routes
pub fn create_rest_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/usr/:user_id", get(accounts::get_account))
        .route("/usr/:user_id/profile_pic", put(accounts::update_profile_pic))
}
