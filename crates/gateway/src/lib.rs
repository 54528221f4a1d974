//! # Roomcast Gateway Crate
//!
//! The network edge of the chat backend: the websocket upgrade endpoint that
//! admits connections into rooms, the per-connection reader/writer pumps, and
//! a handful of REST routes.
//!
//! ## Architecture
//!
//! - **WebSocket**: `/ws?room_id=..&authToken=..` and the connection pumps
//! - **REST**: health probe and the account endpoints
//! - **State**: services shared by every handler
//! - **Middleware**: request logging

pub mod error;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod websocket;

pub use error::{GatewayError, GatewayResult};
pub use state::GatewayState;

use std::sync::Arc;

use axum::{http::Method, middleware as axum_middleware, Router};
use tower_http::cors::{Any, CorsLayer};

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    let state = Arc::new(state);
    Router::new()
        .merge(rest::create_rest_routes().with_state(state.clone()))
        .merge(websocket::create_websocket_routes().with_state(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::PUT])
                .allow_headers(Any),
        )
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
}
