//! Startup orchestration.
//!
//! # Responsibilities
//! - Build every pool (targets, backup, reverse proxies) from a validated config
//! - Register primary targets with the shared health status
//! - Bind pool listeners and load TLS material
//! - Start background tasks (health checks, metrics, admin API)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Every listener is bound before any of them serves, so a port conflict
//!   aborts startup without serving partial traffic
//! - Backups are built first so primaries can replay onto them

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

use crate::admin::{admin_router, AdminState};
use crate::config::{PoolConfig, ProxyConfig};
use crate::health::{HealthChecker, HealthStatus};
use crate::http::PoolServer;
use crate::lifecycle::Shutdown;
use crate::load_balancer::target::parse_upstream;
use crate::load_balancer::{BackendPool, BuildError, Target};
use crate::net::{self, ListenerError};
use crate::observability::metrics;
use crate::proxy::{Dispatcher, ErrorHandler, FailoverToBackup, LogOnly, ReverseProxy, Transport};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Bind(#[from] ListenerError),

    #[error("Failed to load TLS material for port {port}: {source}")]
    Tls {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("Invalid {what} address {value:?}")]
    Address { what: &'static str, value: String },

    #[error("Failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("Server error: {0}")]
    Io(#[from] io::Error),
}

/// Everything the proxy needs at runtime, built once from the config.
pub struct Runtime {
    config: ProxyConfig,
    status: Arc<HealthStatus>,
    pools: Vec<Arc<BackendPool>>,
}

impl Runtime {
    /// Build every pool. `config` is expected to have passed validation.
    pub fn build(config: ProxyConfig, transport: Arc<dyn Transport>) -> Result<Self, StartupError> {
        let status = HealthStatus::shared(config.timeout());
        let pools = config
            .pools
            .iter()
            .map(|pool| build_pool(&config, pool, &transport, &status).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            pools = pools.len(),
            hosts = status.len(),
            "Backend pools built"
        );
        Ok(Self { config, status, pools })
    }

    pub fn status(&self) -> &Arc<HealthStatus> {
        &self.status
    }

    pub fn pools(&self) -> &[Arc<BackendPool>] {
        &self.pools
    }

    /// Bind every pool listener and load TLS material.
    pub async fn bind(self) -> Result<BoundRuntime, StartupError> {
        let mut listeners = Vec::with_capacity(self.pools.len());
        for (pool_config, pool) in self.config.pools.iter().zip(&self.pools) {
            let listener = net::bind_port(pool.port()).await?;
            let tls = match &pool_config.tls {
                Some(tls) => Some(
                    net::load_tls_config(tls)
                        .await
                        .map_err(|source| StartupError::Tls { port: pool.port(), source })?,
                ),
                None => None,
            };
            listeners.push((listener, tls));
        }

        let admin = if self.config.admin.enabled {
            let addr = parse_addr("admin", &self.config.admin.bind_address)?;
            Some(net::bind(addr).await?)
        } else {
            None
        };

        Ok(BoundRuntime {
            runtime: self,
            listeners,
            admin,
        })
    }

    /// Bind and serve until `shutdown` fires.
    pub async fn run(self, shutdown: &Shutdown) -> Result<(), StartupError> {
        self.bind().await?.run(shutdown).await
    }
}

/// A runtime whose sockets are bound but not yet serving.
pub struct BoundRuntime {
    runtime: Runtime,
    listeners: Vec<(TcpListener, Option<RustlsConfig>)>,
    admin: Option<TcpListener>,
}

impl BoundRuntime {
    /// Local address of each pool listener, in pool order.
    pub fn local_addrs(&self) -> io::Result<Vec<SocketAddr>> {
        self.listeners.iter().map(|(l, _)| l.local_addr()).collect()
    }

    pub fn admin_addr(&self) -> Option<SocketAddr> {
        self.admin.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Serve every pool until `shutdown` fires. A server that fails triggers
    /// shutdown of the others; the first error is returned.
    pub async fn run(self, shutdown: &Shutdown) -> Result<(), StartupError> {
        let Self {
            runtime,
            listeners,
            admin,
        } = self;
        let Runtime { config, status, pools } = runtime;

        if config.observability.metrics_enabled {
            let addr = parse_addr("metrics", &config.observability.metrics_address)?;
            metrics::init_metrics(addr)?;
        }

        let checker = HealthChecker::new(status.clone(), config.health_check.interval());
        tokio::spawn(checker.run(shutdown.subscribe()));

        let mut servers = JoinSet::new();
        for (pool, (listener, tls)) in pools.iter().zip(listeners) {
            let dispatcher = Arc::new(Dispatcher::new(pool.clone(), status.clone()));
            let server = PoolServer::new(dispatcher);
            servers.spawn(server.serve(listener, tls, shutdown.subscribe()));
        }

        if let Some(listener) = admin {
            let state = AdminState::new(status.clone(), pools.clone(), config.admin.api_key.clone());
            let mut rx = shutdown.subscribe();
            servers.spawn(async move {
                tracing::info!(address = %listener.local_addr()?, "Admin API listening");
                axum::serve(listener, admin_router(state))
                    .with_graceful_shutdown(async move {
                        let _ = rx.recv().await;
                    })
                    .await
            });
        }

        tracing::info!(pools = pools.len(), "Proxy running");

        let mut first_error = None;
        while let Some(joined) = servers.join_next().await {
            let result = joined.unwrap_or_else(|e| Err(io::Error::other(e)));
            if let Err(e) = result {
                tracing::error!(error = %e, "Server exited with error, shutting down");
                shutdown.trigger();
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(StartupError::Io(e)),
            None => Ok(()),
        }
    }
}

fn build_pool(
    config: &ProxyConfig,
    pool: &PoolConfig,
    transport: &Arc<dyn Transport>,
    status: &HealthStatus,
) -> Result<BackendPool, BuildError> {
    let backup = match pool.backup.as_deref().filter(|b| !b.is_empty()) {
        Some(raw) => {
            let url = parse_upstream(raw)?;
            let proxy = ReverseProxy::new(url.clone(), transport.clone(), Arc::new(LogOnly));
            Some(Arc::new(Target::new(url, None, proxy)))
        }
        None => None,
    };

    let handler: Arc<dyn ErrorHandler> = match &backup {
        Some(backup) => Arc::new(FailoverToBackup::new(
            backup.clone(),
            config.server.max_body_bytes,
        )),
        None => Arc::new(LogOnly),
    };

    let mut targets = Vec::new();
    for raw in config.resolved_urls(pool) {
        let url = parse_upstream(&raw)?;
        let proxy = ReverseProxy::new(url.clone(), transport.clone(), handler.clone());
        let target = Target::new(url, pool.host.clone(), proxy);
        status.register(target.authority());
        targets.push(Arc::new(target));
    }

    tracing::debug!(
        port = pool.port,
        targets = targets.len(),
        backup = backup.as_ref().map(|b| b.url().as_str()),
        "Pool built"
    );
    BackendPool::new(pool.port, targets, backup)
}

fn parse_addr(what: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|_| StartupError::Address {
        what,
        value: value.to_string(),
    })
}
