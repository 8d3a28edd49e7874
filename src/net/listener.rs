//! TCP listener binding for pool ports.

use std::net::{Ipv4Addr, SocketAddr};

use thiserror::Error;
use tokio::net::TcpListener;

#[derive(Debug, Error)]
#[error("Failed to bind {addr}: {source}")]
pub struct ListenerError {
    pub addr: SocketAddr,
    #[source]
    pub source: std::io::Error,
}

/// Bind `0.0.0.0:port`. Port 0 picks an ephemeral port.
pub async fn bind_port(port: u16) -> Result<TcpListener, ListenerError> {
    bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await
}

pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ListenerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError { addr, source })?;

    tracing::info!(
        address = %listener.local_addr().unwrap_or(addr),
        "Listener bound"
    );
    Ok(listener)
}
