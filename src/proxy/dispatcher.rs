//! Per-request entry point for one pool.
//!
//! # Responsibilities
//! - Ask the pool for the next alive target
//! - Present the target's host header and forward through its reverse proxy
//! - Fall back to the backup (unchecked) when nothing is alive
//! - Answer 503 when there is neither

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response, StatusCode};
use axum::response::IntoResponse;

use crate::health::HealthStatus;
use crate::load_balancer::BackendPool;
use crate::observability::metrics;
use crate::proxy::reverse::RequestContext;

/// Routes requests arriving on one pool's port.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    pool: Arc<BackendPool>,
    status: Arc<HealthStatus>,
}

impl Dispatcher {
    pub fn new(pool: Arc<BackendPool>, status: Arc<HealthStatus>) -> Self {
        Self { pool, status }
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }

    pub async fn dispatch(&self, mut request: Request<Body>, remote_addr: SocketAddr) -> Response<Body> {
        let start = Instant::now();
        let ctx = RequestContext {
            local_port: self.pool.port(),
            remote_addr,
        };

        let (route, response) = match self.pool.next_peer(&self.status) {
            Some((target, latency_ms)) => {
                tracing::info!(
                    local_port = ctx.local_port,
                    remote_addr = %remote_addr,
                    host = %target.host_header(),
                    target = %target.url(),
                    latency_ms,
                    "Forwarding to primary"
                );
                match HeaderValue::from_str(target.host_header()) {
                    Ok(host) => {
                        request.headers_mut().insert(header::HOST, host);
                    }
                    Err(e) => {
                        tracing::warn!(host = %target.host_header(), error = %e, "Host header not representable, keeping inbound host");
                    }
                }
                ("primary", target.proxy().serve(request, &ctx).await)
            }
            None => match self.pool.backup() {
                Some(backup) => {
                    tracing::info!(
                        local_port = ctx.local_port,
                        remote_addr = %remote_addr,
                        target = %backup.url(),
                        "No live target, forwarding to backup"
                    );
                    ("backup", backup.proxy().serve(request, &ctx).await)
                }
                None => {
                    tracing::warn!(
                        local_port = ctx.local_port,
                        remote_addr = %remote_addr,
                        "No live target and no backup"
                    );
                    (
                        "unavailable",
                        (StatusCode::SERVICE_UNAVAILABLE, "Service not available").into_response(),
                    )
                }
            },
        };

        metrics::record_request(ctx.local_port, route, response.status().as_u16(), start);
        response
    }
}
