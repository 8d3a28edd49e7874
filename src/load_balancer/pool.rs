//! Backend pool and round-robin selection.
//!
//! # Responsibilities
//! - Hold the ordered targets serving one local port, plus an optional backup
//! - Rotate through targets with a shared atomic cursor
//! - Skip targets the health status reports dead

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::health::HealthStatus;
use crate::load_balancer::target::{BuildError, Target};

/// Targets for one listening port.
///
/// The target list never changes after construction; only the cursor moves.
#[derive(Debug)]
pub struct BackendPool {
    port: u16,
    backends: Vec<Arc<Target>>,
    current: AtomicUsize,
    backup: Option<Arc<Target>>,
}

impl BackendPool {
    pub fn new(
        port: u16,
        backends: Vec<Arc<Target>>,
        backup: Option<Arc<Target>>,
    ) -> Result<Self, BuildError> {
        if backends.is_empty() {
            return Err(BuildError::EmptyPool(port));
        }
        Ok(Self {
            port,
            backends,
            current: AtomicUsize::new(0),
            backup,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn backends(&self) -> &[Arc<Target>] {
        &self.backends
    }

    pub fn backup(&self) -> Option<&Arc<Target>> {
        self.backup.as_ref()
    }

    /// Advance the cursor by one and return it modulo the pool size.
    ///
    /// Always advances, even if the caller ends up skipping this slot.
    pub fn next_index(&self) -> usize {
        let next = self.current.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        next % self.backends.len()
    }

    /// Pick the next alive target, with its last measured RTT.
    ///
    /// Scans at most one full pass starting at [`next_index`](Self::next_index).
    /// When dead targets had to be skipped, the cursor is moved to the winner
    /// so later calls resume next to a healthy slot. That store races with
    /// concurrent callers and only shifts rotation order, never safety.
    ///
    /// Returns `None` when no target is alive; the backup is not considered here.
    pub fn next_peer(&self, status: &HealthStatus) -> Option<(Arc<Target>, i64)> {
        let len = self.backends.len();
        let start = self.next_index();

        for offset in 0..len {
            let idx = (start + offset) % len;
            let target = &self.backends[idx];
            let (rtt_ms, alive) = status.get_status(target.authority());
            if alive {
                if offset != 0 {
                    self.current.store(idx, Ordering::Relaxed);
                }
                return Some((target.clone(), rtt_ms));
            }
        }
        None
    }
}
