//! Pre-parsed request model handed to the dispatch engine.
//!
//! # Responsibilities
//! - Carry everything the router needs: host, path, method, accept list
//! - Generate unique request IDs for tracing
//! - Hold extracted path parameters as a side channel for handlers
//!
//! # Design Decisions
//! - The connection layer owns wire parsing; this type is already decoded
//! - Body is `Bytes` so cloning a request for the log pipeline is cheap
//! - Path parameters are positional (ordered), keeping the engine
//!   host-agnostic about parameter naming

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Unique identifier for a dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fully parsed HTTP request as seen by the dispatch engine.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request ID, generated at the connection boundary.
    pub id: RequestId,

    /// HTTP method.
    pub method: Method,

    /// Host the request was addressed to (lowercase, no port).
    pub host: String,

    /// Absolute request path (always starts with `/`).
    pub path: String,

    /// Request headers.
    pub headers: HeaderMap,

    /// Request body, fully buffered by the connection layer.
    pub body: Bytes,

    /// Content types the client accepts, in preference order.
    pub accept: Vec<String>,

    /// Path parameter values extracted by the router, in template order.
    /// Empty until dispatch resolves the request.
    pub path_parameters: Vec<String>,

    /// Peer address, when the connection layer knows it.
    pub remote_addr: Option<SocketAddr>,

    /// Per-request cancellation signal from the connection layer. Pipeline
    /// stages and handlers may observe it; the router itself never does.
    pub cancel: CancellationToken,
}

impl Request {
    /// Create a request with the minimal routing fields set.
    pub fn new(method: Method, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            method,
            host: normalize_host(&host.into()),
            path: path.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            accept: Vec::new(),
            path_parameters: Vec::new(),
            remote_addr: None,
            cancel: CancellationToken::new(),
        }
    }

    /// First line of the request as it would appear on the wire.
    /// Used in structured error bodies and log records.
    pub fn request_line(&self) -> String {
        format!("{} {} HTTP/1.1", self.method, self.path)
    }
}

/// Lowercase a host and strip any port suffix. IPv6 literals keep their
/// colons: `[::1]:8080` and `::1` both normalize to `::1`.
pub fn normalize_host(host: &str) -> String {
    let host = host.to_ascii_lowercase();
    if let Some(rest) = host.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return rest[..end].to_string();
        }
        return host;
    }
    match host.rsplit_once(':') {
        // A colon in the name part means an unbracketed IPv6 literal,
        // not a host:port pair.
        Some((name, port))
            if !name.contains(':')
                && !port.is_empty()
                && port.chars().all(|c| c.is_ascii_digit()) =>
        {
            name.to_string()
        }
        _ => host,
    }
}

/// Parse an `Accept` header value into an ordered content-type list.
/// Quality parameters are dropped; declaration order is preserved.
pub fn parse_accept(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|part| {
            part.split(';')
                .next()
                .unwrap_or("")
                .trim()
                .to_ascii_lowercase()
        })
        .filter(|ct| !ct.is_empty())
        .collect()
}
