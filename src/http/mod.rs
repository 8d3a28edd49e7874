//! HTTP front end.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection on a pool port
//!     → server.rs (Axum setup, request ID, tracing)
//!     → proxy::Dispatcher (pick target, forward)
//!     → Send to client
//! ```

pub mod server;

pub use server::PoolServer;
