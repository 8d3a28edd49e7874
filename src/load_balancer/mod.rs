//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives on a pool's port
//!     → pool.rs (advance shared cursor)
//!     → scan one full pass, asking health::HealthStatus about each target
//!     → first alive target.rs wins, or None (caller falls back to backup)
//! ```
//!
//! # Design Decisions
//! - One pool per listening port, built once at startup
//! - Round robin only; the RTT is reported, never used to rank targets
//! - Health state lives in the shared status store, not on the target

pub mod pool;
pub mod target;

pub use pool::BackendPool;
pub use target::{BuildError, Target};
