//! Upstream target abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server
//! - Derive the authority used as the health status key
//! - Carry the host header to present and the forwarding handle

use std::fmt;

use thiserror::Error;
use url::Url;

use crate::proxy::reverse::ReverseProxy;

/// Error building a pool or one of its targets.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid upstream url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported scheme {scheme:?} in upstream url {url:?}")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("upstream url {0:?} has no host")]
    MissingHost(String),

    #[error("pool on port {0} has no upstream urls")]
    EmptyPool(u16),
}

/// Parse an upstream URL, accepting only http and https with a host.
pub fn parse_upstream(raw: &str) -> Result<Url, BuildError> {
    let url = Url::parse(raw).map_err(|source| BuildError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(BuildError::UnsupportedScheme {
            url: raw.to_string(),
            scheme: url.scheme().to_string(),
        });
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(BuildError::MissingHost(raw.to_string())),
    }
}

/// `host:port` with the scheme's default port filled in.
pub fn authority_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port_or_known_default() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// A single upstream server. Immutable once built.
pub struct Target {
    url: Url,
    authority: String,
    host_header: String,
    proxy: ReverseProxy,
}

impl Target {
    /// Build a target. `host` overrides the host header presented upstream;
    /// without it the URL's own host (and explicit port, if any) is used.
    pub fn new(url: Url, host: Option<String>, proxy: ReverseProxy) -> Self {
        let authority = authority_of(&url);
        let host_header = match host.filter(|h| !h.is_empty()) {
            Some(h) => h,
            None => match url.port() {
                Some(port) => format!("{}:{}", url.host_str().unwrap_or_default(), port),
                None => url.host_str().unwrap_or_default().to_string(),
            },
        };
        Self {
            url,
            authority,
            host_header,
            proxy,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Dial address and health status key.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Host header presented to this upstream.
    pub fn host_header(&self) -> &str {
        &self.host_header
    }

    /// Forwarding handle.
    pub fn proxy(&self) -> &ReverseProxy {
        &self.proxy
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("url", &self.url.as_str())
            .field("authority", &self.authority)
            .field("host_header", &self.host_header)
            .finish()
    }
}
