//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use poolgate::config::{PoolConfig, ProxyConfig};
use poolgate::lifecycle::{Runtime, Shutdown, StartupError};
use poolgate::proxy::HyperTransport;
use poolgate::HealthStatus;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Raw requests seen by a recording backend.
pub type Seen = Arc<Mutex<Vec<String>>>;

/// Start a backend that answers every request with `200 <name>` and keeps the
/// raw request text (head and body).
pub async fn start_recording_backend(name: &'static str) -> (SocketAddr, Seen) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: Seen = Arc::default();
    let log = seen.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let log = log.clone();
                    tokio::spawn(async move {
                        let request = read_request(&mut socket).await;
                        log.lock().unwrap().push(request);
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            name.len(),
                            name
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, seen)
}

/// An address nothing listens on.
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .filter_map(|l| l.split_once(':'))
                .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

pub fn pool(urls: &[SocketAddr]) -> PoolConfig {
    PoolConfig {
        port: 0,
        host: None,
        urls: urls.iter().map(|a| format!("http://{a}")).collect(),
        upstream: None,
        backup: None,
        tls: None,
    }
}

/// Config with long sweep intervals so tests drive health state themselves.
pub fn config(pools: Vec<PoolConfig>) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.timeout_ms = 500;
    config.health_check.interval_secs = 3600;
    config.pools = pools;
    config
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

pub struct RunningProxy {
    pub addrs: Vec<SocketAddr>,
    pub admin: Option<SocketAddr>,
    pub status: Arc<HealthStatus>,
    shutdown: Shutdown,
    handle: JoinHandle<Result<(), StartupError>>,
}

impl RunningProxy {
    pub fn url(&self, pool: usize, path: &str) -> String {
        format!("http://{}{}", self.addrs[pool], path)
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        self.handle.await.unwrap().unwrap();
    }
}

/// Build, bind and run a proxy with a real hyper transport.
pub async fn start_proxy(config: ProxyConfig) -> RunningProxy {
    let transport = Arc::new(HyperTransport::new(config.timeout()));
    let runtime = Runtime::build(config, transport).unwrap();
    let status = runtime.status().clone();
    let bound = runtime.bind().await.unwrap();
    let addrs = bound
        .local_addrs()
        .unwrap()
        .into_iter()
        .map(|a| SocketAddr::from(([127, 0, 0, 1], a.port())))
        .collect();
    let admin = bound.admin_addr();

    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    let handle = tokio::spawn(async move { bound.run(&signal).await });

    RunningProxy {
        addrs,
        admin,
        status,
        shutdown,
        handle,
    }
}
