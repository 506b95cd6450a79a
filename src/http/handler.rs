//! Handler contract for routed requests.
//!
//! # Design Decisions
//! - Handlers are async and return `Result`; the dispatch loop converts
//!   errors (and panics) into 500 responses, so nothing a handler does can
//!   take down its connection worker
//! - Blanket impl lets plain `async fn(Request) -> Result<Response, _>`
//!   closures register without boilerplate

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::http::request::Request;
use crate::http::response::Response;

/// Error type handlers may return. Converted to a 500 at the dispatch
/// boundary.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed future returned by a handler invocation.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response, HandlerError>> + Send>>;

/// A routed request handler.
///
/// Extracted path parameters arrive on `request.path_parameters`, in the
/// order the template declared them.
pub trait RequestHandler: Send + Sync {
    fn call(&self, request: Request) -> HandlerFuture;
}

/// Shared reference to a registered handler.
pub type HandlerRef = Arc<dyn RequestHandler>;

impl<F, Fut> RequestHandler for F
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, HandlerError>> + Send + 'static,
{
    fn call(&self, request: Request) -> HandlerFuture {
        Box::pin((self)(request))
    }
}

/// Wrap an async closure as a shareable handler.
pub fn handler<F, Fut>(f: F) -> HandlerRef
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, HandlerError>> + Send + 'static,
{
    Arc::new(f)
}
