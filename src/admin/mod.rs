//! Administrative HTTP API.
//!
//! # Routes
//! - `GET /dynamic?upstream=..&server=..&add|remove|weight=..` operation
//!   endpoint, answers with the text listing of the group
//! - `GET /admin/status` version and region usage (JSON)
//! - `GET /admin/upstreams` every group with aggregates and peers (JSON)

pub mod handlers;
pub mod auth;

use std::sync::Arc;
use axum::{
    routing::get,
    Router,
    middleware,
};
use tower_http::trace::TraceLayer;

use crate::engine::Engine;
use self::handlers::*;
use self::auth::admin_auth_middleware;

/// Shared state of the admin router.
#[derive(Debug, Clone)]
pub struct AdminState {
    pub engine: Arc<Engine>,
    pub api_key: Option<String>,
}

impl AdminState {
    pub fn new(engine: Arc<Engine>, api_key: Option<String>) -> Self {
        Self { engine, api_key }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/dynamic", get(dynamic))
        .route("/admin/status", get(get_status))
        .route("/admin/upstreams", get(get_upstreams))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
