//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (pools reference existing upstream groups)
//! - Validate value ranges (timeouts > 0, ports valid and unique)
//! - Reject malformed upstream URLs before any listener binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::load_balancer::target::{parse_upstream, BuildError};

/// A single semantic problem in the configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("no pools configured")]
    NoPools,

    #[error("timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("health_check.interval_secs must be greater than zero")]
    ZeroInterval,

    #[error("pool port must not be zero")]
    ZeroPort,

    #[error("port {0} is used by more than one pool")]
    DuplicatePort(u16),

    #[error("pool on port {port} references unknown upstream group {name:?}")]
    UnknownUpstream { port: u16, name: String },

    #[error("pool on port {0} has no upstream urls")]
    NoUrls(u16),

    #[error("pool on port {port}: {reason}")]
    BadUrl { port: u16, reason: String },

    #[error("pool on port {0}: tls cert_path and key_path must both be set")]
    IncompleteTls(u16),

    #[error("admin api is enabled without an api_key")]
    MissingAdminKey,
}

/// Check a parsed configuration. Every problem found is returned.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.pools.is_empty() {
        errors.push(ValidationError::NoPools);
    }
    if config.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::ZeroInterval);
    }
    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::MissingAdminKey);
    }

    let mut ports = HashSet::new();
    for pool in &config.pools {
        let port = pool.port;
        if port == 0 {
            errors.push(ValidationError::ZeroPort);
        } else if !ports.insert(port) {
            errors.push(ValidationError::DuplicatePort(port));
        }

        if let Some(name) = &pool.upstream {
            if !config.upstreams.contains_key(name) {
                errors.push(ValidationError::UnknownUpstream { port, name: name.clone() });
            }
        }

        let urls = config.resolved_urls(pool);
        if urls.is_empty() {
            errors.push(ValidationError::NoUrls(port));
        }
        for url in urls.iter().chain(pool.backup.iter().filter(|b| !b.is_empty())) {
            if let Err(e) = parse_upstream(url) {
                errors.push(bad_url(port, e));
            }
        }

        if let Some(tls) = &pool.tls {
            if tls.cert_path.is_empty() || tls.key_path.is_empty() {
                errors.push(ValidationError::IncompleteTls(port));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn bad_url(port: u16, error: BuildError) -> ValidationError {
    ValidationError::BadUrl { port, reason: error.to_string() }
}
