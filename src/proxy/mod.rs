//! Request forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request on a pool port
//!     → dispatcher.rs (pick primary / backup / 503)
//!     → reverse.rs (rewrite URI, strip hop-by-hop, X-Forwarded-For)
//!     → transport.rs (pooled hyper client)
//!     → on failure: error_handler.rs (502, or replay on backup)
//! ```
//!
//! # Design Decisions
//! - Every target owns its own reverse proxy; the backup's proxy only logs
//!   failures, a primary's proxy replays on the backup when one exists
//! - Forwarding failures never touch health state

pub mod dispatcher;
pub mod error_handler;
pub mod reverse;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::Dispatcher;
pub use error_handler::{ErrorHandler, FailoverToBackup, LogOnly};
pub use reverse::{RequestContext, ReverseProxy};
pub use transport::{ForwardError, HyperTransport, Transport};
