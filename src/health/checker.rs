//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every host known to [`HealthStatus`]
//! - Record the connect RTT on success, `0` on failure
//! - Report a failed/total summary per sweep
//!
//! # Design Decisions
//! - Probes are bare TCP connects; no bytes are exchanged
//! - Probes within one sweep run concurrently
//! - Sweeps are serialized: the sweep is awaited inside the tick loop and ticks
//!   missed while it runs are skipped

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::health::status::{HealthStatus, DEAD};
use crate::observability::metrics;

/// Why a single probe failed.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("connect failed: {0}")]
    Connect(#[from] io::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Opens (and immediately drops) a connection to a host.
pub trait Prober: Send + Sync + 'static {
    fn connect(&self, host: &str) -> impl Future<Output = io::Result<()>> + Send;
}

/// Plain TCP connect probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

impl Prober for TcpProber {
    async fn connect(&self, host: &str) -> io::Result<()> {
        let stream = TcpStream::connect(host).await?;
        drop(stream);
        Ok(())
    }
}

impl<P: Prober> Prober for Arc<P> {
    fn connect(&self, host: &str) -> impl Future<Output = io::Result<()>> + Send {
        (**self).connect(host)
    }
}

/// Result of one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub failed: usize,
    pub total: usize,
}

pub struct HealthChecker<P = TcpProber> {
    status: Arc<HealthStatus>,
    interval: Duration,
    prober: P,
}

impl HealthChecker<TcpProber> {
    pub fn new(status: Arc<HealthStatus>, interval: Duration) -> Self {
        Self::with_prober(status, interval, TcpProber)
    }
}

impl<P: Prober> HealthChecker<P> {
    pub fn with_prober(status: Arc<HealthStatus>, interval: Duration, prober: P) -> Self {
        Self {
            status,
            interval,
            prober,
        }
    }

    /// Sweep once per interval until shutdown. The first sweep fires one
    /// interval after start; hosts keep their seed value until then.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = ?self.interval,
            timeout = ?self.status.timeout(),
            hosts = self.status.len(),
            "Health checker starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health checker received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every known host once and write the results back.
    pub async fn sweep(&self) -> SweepSummary {
        let hosts = self.status.hosts();
        let results = join_all(hosts.iter().map(|host| self.probe(host))).await;

        let mut failed = 0;
        for (host, result) in hosts.iter().zip(results) {
            match result {
                Ok(rtt_ms) => {
                    self.status.set_status(host, rtt_ms);
                    metrics::record_backend_health(host, rtt_ms);
                }
                Err(e) => {
                    tracing::warn!(host = %host, error = %e, "Health probe failed");
                    failed += 1;
                    self.status.set_status(host, DEAD);
                    metrics::record_backend_health(host, DEAD);
                }
            }
        }

        let summary = SweepSummary {
            failed,
            total: hosts.len(),
        };
        tracing::info!(failed = summary.failed, total = summary.total, "Health sweep complete");
        metrics::record_sweep(summary.failed, summary.total);
        summary
    }

    /// Connect RTT in milliseconds. Clamped to 1 so a success is never stored
    /// as the dead marker.
    async fn probe(&self, host: &str) -> Result<i64, ProbeError> {
        let timeout = self.status.timeout();
        let start = Instant::now();
        match time::timeout(timeout, self.prober.connect(host)).await {
            Ok(Ok(())) => {
                let elapsed = i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX);
                Ok(elapsed.max(1))
            }
            Ok(Err(e)) => Err(ProbeError::Connect(e)),
            Err(_) => Err(ProbeError::Timeout(timeout)),
        }
    }
}
