//! The per-request dispatch loop.
//!
//! # Responsibilities
//! - Run pipeline stages in order, honoring short-circuit responses
//! - Resolve the request and invoke the bound handler
//! - Translate routing misses into 404/405/406 and handler failures into
//!   500, so a client always receives a well-formed response
//! - Emit request/response log events without blocking
//!
//! # Design Decisions
//! - Handlers run on their own task: a panic is contained there and
//!   surfaces as a 500, never as a dead connection worker
//! - Failure detail (error chain / panic payload) only enters 5xx bodies
//!   when `debug_errors` is enabled

use std::sync::{Arc, RwLock};
use std::time::Instant;

use axum::http::StatusCode;

use crate::dispatch::pipeline::StageRef;
use crate::http::request::Request;
use crate::http::response::{FailureDetail, Response};
use crate::logging::event::LogEvent;
use crate::logging::registry::{EventRegistry, LoggingError};
use crate::observability::metrics;
use crate::routing::resolver::{RequestHandle, Router};

/// Group tag shared by the dispatch loop's built-in events.
pub const DISPATCH_GROUP: &str = "dispatch";

/// Orchestrates pipeline → resolver → handler → error translation →
/// logging for every accepted request.
pub struct Dispatcher {
    router: Arc<Router>,
    registry: Arc<EventRegistry>,
    stages: RwLock<Vec<StageRef>>,

    request_event: Arc<LogEvent>,
    response_event: Arc<LogEvent>,
    error_event: Arc<LogEvent>,

    debug_errors: bool,
}

impl Dispatcher {
    /// Build a dispatcher, registering its built-in `request`, `response`
    /// and `error` events under the `dispatch` group.
    pub fn new(
        router: Arc<Router>,
        registry: Arc<EventRegistry>,
        debug_errors: bool,
    ) -> Result<Self, LoggingError> {
        let request_event =
            registry.register_event("/dispatch", "server", "request", &[DISPATCH_GROUP])?;
        let response_event =
            registry.register_event("/dispatch", "server", "response", &[DISPATCH_GROUP])?;
        let error_event =
            registry.register_event("/dispatch", "server", "error", &[DISPATCH_GROUP])?;

        Ok(Self {
            router,
            registry,
            stages: RwLock::new(Vec::new()),
            request_event,
            response_event,
            error_event,
            debug_errors,
        })
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn registry(&self) -> &Arc<EventRegistry> {
        &self.registry
    }

    /// Append a pre-routing stage. Stages are fixed once serving begins.
    pub fn add_pipeline(&self, stage: StageRef) {
        tracing::debug!(stage = %stage.name(), "Pipeline stage appended");
        self.stages
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(stage);
    }

    /// Dispatch one request to a response. Never fails: every routing miss
    /// and handler failure becomes a structured HTTP response.
    pub async fn dispatch(&self, request: Request) -> Response {
        let start = Instant::now();
        let request_id = request.id;
        let method = request.method.clone();
        let cancel = request.cancel.clone();

        self.request_event.log_request(&Arc::new(request.clone()));

        // 1. Pipeline stages, first response wins.
        let stages: Vec<StageRef> = self
            .stages
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        let mut request = request;
        for stage in stages {
            let (req, response) = stage.process(request, cancel.clone()).await;
            request = req;
            if let Some(response) = response {
                tracing::debug!(
                    request_id = %request_id,
                    stage = %stage.name(),
                    status = %response.status,
                    "Pipeline stage short-circuited dispatch"
                );
                return self.finish(Arc::new(request), response, start);
            }
        }

        // 2. Resolve and invoke.
        let response = match self.router.resolve(
            &request.host,
            &request.path,
            &request.method,
            &request.accept,
        ) {
            RequestHandle::Handler { handler, params } => {
                request.path_parameters = params;
                let logged = Arc::new(request.clone());
                let response = self.invoke(handler, request).await;
                return self.finish(logged, response, start);
            }
            RequestHandle::NotFound { reason } => {
                tracing::debug!(request_id = %request_id, method = %method, reason = %reason, "No route");
                Response::error(StatusCode::NOT_FOUND, &request.request_line(), &reason)
            }
            RequestHandle::MethodNotAllowed => Response::error(
                StatusCode::METHOD_NOT_ALLOWED,
                &request.request_line(),
                "method not allowed for this path",
            ),
            RequestHandle::NotAcceptable => Response::error(
                StatusCode::NOT_ACCEPTABLE,
                &request.request_line(),
                "no acceptable content type for this method",
            ),
        };

        self.finish(Arc::new(request), response, start)
    }

    /// Invoke a handler on its own task so neither errors nor panics can
    /// escape the dispatch boundary.
    async fn invoke(&self, handler: crate::http::handler::HandlerRef, request: Request) -> Response {
        let request_line = request.request_line();
        let request_id = request.id;
        match tokio::spawn(handler.call(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => {
                tracing::error!(request_id = %request_id, error = %error, "Handler failed");
                let detail = self
                    .debug_errors
                    .then(|| FailureDetail::from_error(error.as_ref()));
                Response::handler_failure(&request_line, &error.to_string(), detail)
            }
            Err(join_error) => {
                let message = if join_error.is_panic() {
                    match join_error.into_panic().downcast::<String>() {
                        Ok(s) => *s,
                        Err(payload) => payload
                            .downcast::<&str>()
                            .map(|s| s.to_string())
                            .unwrap_or_else(|_| "handler panicked".to_string()),
                    }
                } else {
                    "handler task was cancelled".to_string()
                };
                tracing::error!(request_id = %request_id, panic = %message, "Handler panicked");
                let detail = self.debug_errors.then(|| FailureDetail::from_panic(&message));
                Response::handler_failure(&request_line, "handler panicked", detail)
            }
        }
    }

    /// Record metrics and emit response/error events. Enqueue only.
    fn finish(&self, request: Arc<Request>, response: Response, start: Instant) -> Response {
        metrics::record_request(request.method.as_str(), response.status.as_u16(), start);
        tracing::debug!(
            request_id = %request.id,
            status = %response.status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request dispatched"
        );
        self.response_event.log_response(&request, &response);
        if response.status.is_client_error() || response.status.is_server_error() {
            self.error_event.log_response(&request, &response);
        }
        response
    }
}
