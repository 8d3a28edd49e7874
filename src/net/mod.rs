//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Startup
//!     → listener.rs (bind one socket per pool port)
//!     → tls.rs (load cert/key for pools that terminate TLS)
//!     → Hand off to http::PoolServer
//! ```

pub mod listener;
pub mod tls;

pub use listener::{bind, bind_port, ListenerError};
pub use tls::load_tls_config;
