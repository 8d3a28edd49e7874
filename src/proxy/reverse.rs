//! Single-upstream reverse proxy.
//!
//! # Responsibilities
//! - Rewrite the inbound URI onto the upstream (scheme, authority, path, query)
//! - Strip hop-by-hop headers in both directions
//! - Append the client address to `X-Forwarded-For`
//! - Hand transport failures to the configured [`ErrorHandler`]
//!
//! The `Host` header is left alone; the dispatcher decides what to present.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    request::Parts,
    Request, Response, StatusCode, Uri, Version,
};
use axum::response::IntoResponse;
use futures_util::stream::{self, StreamExt};
use url::{Position, Url};

use crate::proxy::error_handler::ErrorHandler;
use crate::proxy::transport::{ForwardError, Transport};

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Hop-by-hop headers (RFC 7230 section 6.1), never forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Facts about the inbound request used in logs and forwarding headers.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub local_port: u16,
    pub remote_addr: SocketAddr,
}

/// Forwarding handle for one upstream.
#[derive(Debug, Clone)]
pub struct ReverseProxy {
    upstream: Url,
    transport: Arc<dyn Transport>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl ReverseProxy {
    pub fn new(
        upstream: Url,
        transport: Arc<dyn Transport>,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Self {
        Self {
            upstream,
            transport,
            error_handler,
        }
    }

    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    /// Forward `request` and return the upstream response, or whatever the
    /// error handler produces when forwarding fails.
    pub async fn serve(&self, request: Request<Body>, ctx: &RequestContext) -> Response<Body> {
        let (request, replay) = match self.error_handler.replay_limit() {
            Some(limit) => match buffer(request, limit).await {
                Ok(buffered) => buffered,
                Err(e) => {
                    tracing::warn!(
                        local_port = ctx.local_port,
                        remote_addr = %ctx.remote_addr,
                        error = %e,
                        "Request body could not be read"
                    );
                    return (StatusCode::BAD_REQUEST, "Request body could not be read").into_response();
                }
            },
            None => (request, None),
        };

        let outbound = match self.outbound(request, ctx.remote_addr.ip()) {
            Ok(req) => req,
            Err(e) => return self.error_handler.handle(&self.upstream, replay, ctx, e).await,
        };

        match self.transport.send(outbound).await {
            Ok(mut response) => {
                strip_hop_by_hop(response.headers_mut());
                response
            }
            Err(e) => self.error_handler.handle(&self.upstream, replay, ctx, e).await,
        }
    }

    fn outbound(&self, request: Request<Body>, client_ip: IpAddr) -> Result<Request<Body>, ForwardError> {
        let (mut parts, body) = request.into_parts();
        parts.uri = upstream_uri(&self.upstream, &parts.uri)?;
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);
        append_forwarded_for(&mut parts.headers, client_ip);
        Ok(Request::from_parts(parts, body))
    }
}

/// Read the body into memory so the request can be sent twice.
///
/// Bodies larger than `limit` are forwarded as a stream with no replay copy.
async fn buffer(
    request: Request<Body>,
    limit: usize,
) -> Result<(Request<Body>, Option<Request<Body>>), axum::Error> {
    let (parts, body) = request.into_parts();
    let declared = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return Ok((Request::from_parts(parts, body), None));
    }

    let mut data = body.into_data_stream();
    let mut chunks: Vec<Bytes> = Vec::new();
    let mut size = 0;
    while let Some(chunk) = data.next().await {
        let chunk = chunk?;
        size += chunk.len();
        chunks.push(chunk);
        if size > limit {
            // Put back what was already read in front of the rest.
            let head = stream::iter(chunks.into_iter().map(Ok::<_, axum::Error>));
            let body = Body::from_stream(head.chain(data));
            return Ok((Request::from_parts(parts, body), None));
        }
    }

    let mut joined = Vec::with_capacity(size);
    for chunk in &chunks {
        joined.extend_from_slice(chunk);
    }
    let bytes = Bytes::from(joined);
    let copy = copy_request(&parts, bytes.clone());
    Ok((Request::from_parts(parts, Body::from(bytes)), Some(copy)))
}

fn copy_request(parts: &Parts, body: Bytes) -> Request<Body> {
    let mut request = Request::new(Body::from(body));
    *request.method_mut() = parts.method.clone();
    *request.uri_mut() = parts.uri.clone();
    *request.version_mut() = parts.version;
    *request.headers_mut() = parts.headers.clone();
    request
}

/// Place the inbound path and query under the upstream URL.
pub(crate) fn upstream_uri(upstream: &Url, inbound: &Uri) -> Result<Uri, ForwardError> {
    let authority = &upstream[Position::BeforeHost..Position::AfterPort];
    let path = join_path(upstream.path(), inbound.path());
    let query = match (upstream.query(), inbound.query()) {
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => format!("?{a}&{b}"),
        (Some(a), _) if !a.is_empty() => format!("?{a}"),
        (_, Some(b)) if !b.is_empty() => format!("?{b}"),
        _ => String::new(),
    };
    let uri: Uri = format!("{}://{}{}{}", upstream.scheme(), authority, path, query).parse()?;
    Ok(uri)
}

fn join_path(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named by Connection are hop-by-hop too.
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, client_ip: IpAddr) {
    let ip = client_ip.to_string();
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) if !prior.is_empty() => format!("{prior}, {ip}"),
        _ => ip.clone(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
