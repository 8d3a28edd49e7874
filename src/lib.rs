//! Multi-port round-robin HTTP load balancer library.

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod net;
pub mod observability;
pub mod proxy;

pub use config::schema::ProxyConfig;
pub use health::HealthStatus;
pub use http::PoolServer;
pub use lifecycle::{Runtime, Shutdown};
pub use load_balancer::BackendPool;
