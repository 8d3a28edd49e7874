//! Per-pool HTTP server.
//!
//! # Responsibilities
//! - Accept plain or TLS connections on one pool's port
//! - Wire up middleware (request ID, tracing)
//! - Hand every request, whatever its path or method, to the pool dispatcher
//! - Stop accepting on shutdown and drain in-flight requests

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::proxy::Dispatcher;

/// How long TLS connections may drain after shutdown is signalled.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP server fronting one backend pool.
pub struct PoolServer {
    dispatcher: Arc<Dispatcher>,
}

impl PoolServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(forward)
            .with_state(self.dispatcher.clone())
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Serve until `shutdown` fires. TLS is terminated here when `tls` is set.
    pub async fn serve(
        self,
        listener: TcpListener,
        tls: Option<RustlsConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        let addr = listener.local_addr()?;
        let port = self.dispatcher.pool().port();
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        match tls {
            None => {
                tracing::info!(address = %addr, port, "Pool server starting");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                    })
                    .await?;
            }
            Some(config) => {
                tracing::info!(address = %addr, port, "Pool server starting with TLS");
                let handle = axum_server::Handle::new();
                let trigger = handle.clone();
                tokio::spawn(async move {
                    let _ = shutdown.recv().await;
                    trigger.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
                });
                axum_server::from_tcp_rustls(listener.into_std()?, config)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
        }

        tracing::info!(port, "Pool server stopped");
        Ok(())
    }
}

async fn forward(
    State(dispatcher): State<Arc<Dispatcher>>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response<Body> {
    dispatcher.dispatch(request, remote_addr).await
}
