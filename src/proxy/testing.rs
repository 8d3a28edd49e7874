//! In-memory transport and target builders for unit tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use futures_util::future::BoxFuture;

use crate::load_balancer::target::{authority_of, parse_upstream, Target};
use crate::proxy::error_handler::{ErrorHandler, LogOnly};
use crate::proxy::reverse::ReverseProxy;
use crate::proxy::transport::{ForwardError, Transport};

/// What a [`RecordingTransport`] saw.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: String,
    pub uri: String,
    pub host: Option<String>,
    pub forwarded_for: Option<String>,
    pub had_connection_header: bool,
    pub body: String,
}

/// Records every request and answers 200 with the upstream authority as body,
/// except for authorities listed as failing, which get a refused connection.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    failing: HashSet<String>,
}

impl RecordingTransport {
    pub fn failing(authorities: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: authorities.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, ForwardError>> {
        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
            let text = |name: &str| {
                parts
                    .headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            self.calls.lock().unwrap().push(Call {
                method: parts.method.to_string(),
                uri: parts.uri.to_string(),
                host: text(header::HOST.as_str()),
                forwarded_for: text("x-forwarded-for"),
                had_connection_header: parts.headers.contains_key(header::CONNECTION),
                body: String::from_utf8_lossy(&body).into_owned(),
            });

            let dial = url::Url::parse(&parts.uri.to_string())
                .map(|u| authority_of(&u))
                .unwrap_or_default();
            if self.failing.contains(&dial) {
                return Err(ForwardError::Io(std::io::ErrorKind::ConnectionRefused.into()));
            }
            Ok(Response::builder()
                .status(StatusCode::OK)
                .body(Body::from(dial))
                .unwrap())
        })
    }
}

pub fn proxy_with(url: &str, transport: Arc<dyn Transport>, handler: Arc<dyn ErrorHandler>) -> ReverseProxy {
    ReverseProxy::new(parse_upstream(url).unwrap(), transport, handler)
}

pub fn proxy(url: &str) -> ReverseProxy {
    proxy_with(url, Arc::new(RecordingTransport::default()), Arc::new(LogOnly))
}

pub fn target(url: &str) -> Target {
    Target::new(parse_upstream(url).unwrap(), None, proxy(url))
}

pub fn target_with(url: &str, transport: Arc<RecordingTransport>) -> Target {
    Target::new(
        parse_upstream(url).unwrap(),
        None,
        proxy_with(url, transport, Arc::new(LogOnly)),
    )
}
