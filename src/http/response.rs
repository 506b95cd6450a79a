//! Response model and structured error bodies.
//!
//! # Responsibilities
//! - Represent the response handed back to the connection layer
//! - Synthesize machine-readable JSON error bodies (404/405/406/500)
//!
//! # Design Decisions
//! - Error bodies always carry `request` (first request line) and
//!   `description`; 5xx bodies include failure detail only when the
//!   server runs with `debug_errors` enabled

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use serde::Serialize;

/// A response produced by a handler or synthesized by the dispatch loop.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    /// Empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Plain-text response.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        let mut resp = Self::new(status);
        resp.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        resp.body = Bytes::from(body.into());
        resp
    }

    /// JSON response serialized from any `Serialize` value.
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        let mut resp = Self::new(status);
        resp.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        // Serialization of our own body types cannot fail; fall back to an
        // empty object rather than panicking on foreign types.
        resp.body = Bytes::from(serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec()));
        resp
    }

    /// Structured error response carrying the request line and a
    /// machine-readable reason.
    pub fn error(status: StatusCode, request_line: &str, description: &str) -> Self {
        Self::json(
            status,
            &ErrorBody {
                request: request_line,
                description,
                detail: None,
            },
        )
    }

    /// 500 response for a failed or panicked handler. `detail` is only
    /// populated when the server runs in debug-errors mode.
    pub fn handler_failure(
        request_line: &str,
        description: &str,
        detail: Option<FailureDetail>,
    ) -> Self {
        Self::json(
            StatusCode::INTERNAL_SERVER_ERROR,
            &ErrorBody {
                request: request_line,
                description,
                detail,
            },
        )
    }
}

/// JSON body for synthesized error responses.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    request: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<FailureDetail>,
}

/// Diagnostic detail attached to 5xx bodies in debug-errors mode.
/// The Rust counterpart of a stack trace: the error source chain and the
/// failure kind.
#[derive(Debug, Serialize)]
pub struct FailureDetail {
    /// Error source chain, outermost first.
    pub source: Vec<String>,
    /// Failure classification ("error" or "panic").
    pub kind: String,
}

impl FailureDetail {
    /// Build detail from an error's source chain.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut source = Vec::new();
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
        while let Some(e) = current {
            source.push(e.to_string());
            current = e.source();
        }
        Self {
            source,
            kind: "error".to_string(),
        }
    }

    /// Build detail from a panic payload.
    pub fn from_panic(message: &str) -> Self {
        Self {
            source: vec![message.to_string()],
            kind: "panic".to_string(),
        }
    }
}
