//! Reactions to a failed forward.
//!
//! A forward can fail after a target was already chosen (refused, reset,
//! dial timeout). The reverse proxy of that target hands the failure to its
//! handler, which either answers with an error or replays the request
//! against the pool's backup.

use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use futures_util::future::BoxFuture;
use url::Url;

use crate::load_balancer::Target;
use crate::proxy::reverse::RequestContext;
use crate::proxy::transport::ForwardError;

pub trait ErrorHandler: Send + Sync + fmt::Debug {
    /// Body size to buffer before forwarding so `handle` receives a replayable
    /// copy of the request. `None` means no copy is kept.
    fn replay_limit(&self) -> Option<usize> {
        None
    }

    fn handle<'a>(
        &'a self,
        upstream: &'a Url,
        replay: Option<Request<Body>>,
        ctx: &'a RequestContext,
        error: ForwardError,
    ) -> BoxFuture<'a, Response<Body>>;
}

/// Log the failure and answer 502.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnly;

impl ErrorHandler for LogOnly {
    fn handle<'a>(
        &'a self,
        upstream: &'a Url,
        _replay: Option<Request<Body>>,
        ctx: &'a RequestContext,
        error: ForwardError,
    ) -> BoxFuture<'a, Response<Body>> {
        Box::pin(async move {
            tracing::error!(
                local_port = ctx.local_port,
                remote_addr = %ctx.remote_addr,
                upstream = %upstream,
                error = %error,
                "Upstream request failed"
            );
            bad_gateway()
        })
    }
}

/// Replay the request against the pool's backup target.
///
/// The backup is used as-is: it is not liveness checked and its own failures
/// are only logged.
#[derive(Debug, Clone)]
pub struct FailoverToBackup {
    backup: Arc<Target>,
    max_body_bytes: usize,
}

impl FailoverToBackup {
    pub fn new(backup: Arc<Target>, max_body_bytes: usize) -> Self {
        Self {
            backup,
            max_body_bytes,
        }
    }
}

impl ErrorHandler for FailoverToBackup {
    fn replay_limit(&self) -> Option<usize> {
        Some(self.max_body_bytes)
    }

    fn handle<'a>(
        &'a self,
        upstream: &'a Url,
        replay: Option<Request<Body>>,
        ctx: &'a RequestContext,
        error: ForwardError,
    ) -> BoxFuture<'a, Response<Body>> {
        Box::pin(async move {
            let Some(request) = replay else {
                tracing::error!(
                    local_port = ctx.local_port,
                    upstream = %upstream,
                    error = %error,
                    "Upstream request failed and request cannot be replayed"
                );
                return bad_gateway();
            };

            tracing::warn!(
                local_port = ctx.local_port,
                remote_addr = %ctx.remote_addr,
                upstream = %upstream,
                backup = %self.backup.url(),
                error = %error,
                "Upstream request failed, replaying on backup"
            );
            self.backup.proxy().serve(request, ctx).await
        })
    }
}

fn bad_gateway() -> Response<Body> {
    (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
}
