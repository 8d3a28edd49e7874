//! Read-only admin API.
//!
//! Exposes pool layout and health state as JSON behind a bearer token.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::health::HealthStatus;
use crate::load_balancer::BackendPool;

#[derive(Clone)]
pub struct AdminState {
    pub status: Arc<HealthStatus>,
    pub pools: Arc<[Arc<BackendPool>]>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(status: Arc<HealthStatus>, pools: Vec<Arc<BackendPool>>, api_key: String) -> Self {
        Self {
            status,
            pools: pools.into(),
            api_key: api_key.into(),
        }
    }
}

pub fn admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/pools", get(get_pools))
        .route("/admin/health", get(get_health))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
