//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (checker.rs):
//!     Periodic timer
//!     → TCP connect to each known host
//!     → Write RTT (alive) or 0 (dead) into status.rs
//!
//! Selection (load_balancer::pool):
//!     Every request reads status.rs synchronously
//! ```
//!
//! # Design Decisions
//! - One status store per process, injected into pools and the checker
//! - Liveness is binary: a single failed probe marks a host dead until the
//!   next successful one
//! - Backup targets are never registered, so they are never probed

pub mod checker;
pub mod status;

pub use checker::{HealthChecker, Prober, SweepSummary, TcpProber};
pub use status::HealthStatus;
