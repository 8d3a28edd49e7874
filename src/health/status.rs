//! Shared liveness store.
//!
//! Maps a target authority (`host:port`) to the last probe result. `0` means the
//! target is dead; any other value means alive and is the last measured
//! round-trip time in milliseconds. The RTT is informational only.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

/// Value every primary target starts with, before the first sweep runs.
pub const SEED_RTT_MS: i64 = 10;

/// Value recorded for a target whose probe failed.
pub const DEAD: i64 = 0;

/// Concurrent host → RTT map plus the probe timeout.
///
/// One instance is shared (via `Arc`) by every pool and the health checker.
#[derive(Debug)]
pub struct HealthStatus {
    entries: DashMap<String, i64>,
    timeout: Duration,
}

impl HealthStatus {
    pub fn new(timeout: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            timeout,
        }
    }

    /// Convenience constructor for the shared handle.
    pub fn shared(timeout: Duration) -> Arc<Self> {
        Arc::new(Self::new(timeout))
    }

    /// Probe timeout applied to every host.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Seed a host with [`SEED_RTT_MS`] unless it already has an entry.
    pub fn register(&self, host: &str) {
        self.entries.entry(host.to_string()).or_insert(SEED_RTT_MS);
    }

    /// Unconditional upsert.
    pub fn set_status(&self, host: &str, value: i64) {
        self.entries.insert(host.to_string(), value);
    }

    /// Last stored value and whether the host counts as alive.
    ///
    /// Unknown hosts fail closed and read as `(0, false)`.
    pub fn get_status(&self, host: &str) -> (i64, bool) {
        match self.entries.get(host) {
            Some(entry) => {
                let value = *entry.value();
                (value, value != DEAD)
            }
            None => (DEAD, false),
        }
    }

    /// Hosts known at the time of the call.
    pub fn hosts(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    /// Sorted copy of every entry.
    pub fn snapshot(&self) -> Vec<(String, i64)> {
        let mut all: Vec<_> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        all.sort();
        all
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
