//! HTTP connection adapter.
//!
//! # Responsibilities
//! - Accept connections via axum/hyper (plain or TLS)
//! - Translate wire requests into the engine's `Request` model
//! - Hand every request to the dispatch loop and write its response back
//! - Expose the registration surface (APIs, routes, pipeline, log events)
//!
//! # Design Decisions
//! - The engine never sees wire details; the adapter owns body buffering,
//!   host extraction and request IDs
//! - Graceful shutdown stops accepting, finishes in-flight dispatch, then
//!   terminates the log sink consumers

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Method, Request as WireRequest, StatusCode},
    response::{IntoResponse, Response as WireResponse},
    Router as WireRouter,
};
use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::schema::ServerConfig;
use crate::dispatch::dispatcher::Dispatcher;
use crate::dispatch::pipeline::StageRef;
use crate::http::handler::HandlerRef;
use crate::http::request::{normalize_host, parse_accept, Request};
use crate::logging::event::{LogEvent, LogTarget};
use crate::logging::registry::{EventRegistry, LoggingError};
use crate::logging::sink::SinkHub;
use crate::observability::metrics;
use crate::routing::resolver::{Api, Router};
use crate::routing::RoutingError;

/// Errors raised while building or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("TLS requested but [listener.tls] is not configured")]
    TlsNotConfigured,
}

/// Application state injected into the ingress handler.
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
    max_body_size: usize,
}

/// Embeddable virtual-hosting HTTP server.
pub struct HttpServer {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
    hub: Arc<SinkHub>,
}

impl HttpServer {
    /// Create a server with the given configuration: starts the log sink
    /// consumers and registers the dispatch loop's built-in events.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        std::fs::create_dir_all(&config.logging.dir)?;
        let hub = SinkHub::start(config.logging.dir.clone());
        let registry = Arc::new(EventRegistry::new(hub.clone()));
        let router = Arc::new(Router::new());
        let dispatcher = Arc::new(Dispatcher::new(
            router,
            registry.clone(),
            config.errors.debug_errors,
        )?);

        // Pre-configured log subscriptions; validation already checked the
        // target names.
        for sub in &config.logging.debug {
            match sub.target.parse::<LogTarget>() {
                Ok(target) => {
                    if !registry.debug(&sub.event, target) {
                        tracing::warn!(
                            event = %sub.event,
                            target = %sub.target,
                            "Configured log subscription matches no event"
                        );
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Skipping log subscription"),
            }
        }

        Ok(Self {
            config,
            dispatcher,
            hub,
        })
    }

    /// The routing engine, for registration beyond the helpers below.
    pub fn router(&self) -> &Arc<Router> {
        self.dispatcher.router()
    }

    /// The log event registry.
    pub fn registry(&self) -> &Arc<EventRegistry> {
        self.dispatcher.registry()
    }

    /// The sink hub (pluggable file naming, extra transports, `stop()`).
    pub fn sink_hub(&self) -> &Arc<SinkHub> {
        &self.hub
    }

    /// Mount a sub-API at (host, mount_path).
    pub fn add_api<A: Api + 'static>(
        &self,
        host: &str,
        mount_path: &str,
        api: Arc<A>,
    ) -> Result<Arc<A>, RoutingError> {
        self.router().add_api(host, mount_path, api)
    }

    /// Register a handler on the flat template table.
    pub fn add_method_callback(
        &self,
        host: &str,
        method: Method,
        template: &str,
        content_type: Option<&str>,
        handler: HandlerRef,
    ) -> Result<(), RoutingError> {
        self.router()
            .add_method_callback(host, method, template, content_type, handler)
    }

    /// Append a pre-routing pipeline stage.
    pub fn add_pipeline(&self, stage: StageRef) {
        self.dispatcher.add_pipeline(stage);
    }

    /// Register a named log event.
    pub fn register_event(
        &self,
        path: &str,
        context: &str,
        name: &str,
        groups: &[&str],
    ) -> Result<Arc<LogEvent>, LoggingError> {
        self.registry().register_event(path, context, name, groups)
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn build_app(&self) -> WireRouter {
        let state = AppState {
            dispatcher: self.dispatcher.clone(),
            max_body_size: self.config.listener.max_body_size,
        };
        // Every method and path funnels through the engine's dispatch loop.
        WireRouter::new()
            .fallback(ingress)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.timeouts.request_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server on the given listener until the shutdown signal.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .build_app()
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        // Connections are drained; now stop the log consumers.
        self.hub.stop();
        self.hub.join().await;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS on `addr` until the shutdown signal.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let tls = self
            .config
            .listener
            .tls
            .clone()
            .ok_or(ServerError::TlsNotConfigured)?;
        let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;

        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let watcher = handle.clone();
        let mut shutdown = shutdown;
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            watcher.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        let app = self
            .build_app()
            .into_make_service_with_connect_info::<SocketAddr>();

        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(app)
            .await?;

        self.hub.stop();
        self.hub.join().await;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Single ingress point: every wire request becomes one engine dispatch.
async fn ingress(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: WireRequest<Body>,
) -> WireResponse {
    let (parts, body) = request.into_parts();

    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(normalize_host)
        .or_else(|| parts.uri.host().map(normalize_host))
        .unwrap_or_default();

    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(_) => {
            metrics::record_request(parts.method.as_str(), 413, std::time::Instant::now());
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
        }
    };

    let mut req = Request::new(parts.method.clone(), host, parts.uri.path().to_string());
    req.accept = parts
        .headers
        .get(header::ACCEPT)
        .and_then(|h| h.to_str().ok())
        .map(parse_accept)
        .unwrap_or_default();
    req.headers = parts.headers;
    req.body = body;
    req.remote_addr = Some(addr);
    let request_id = req.id;

    tracing::debug!(
        request_id = %request_id,
        method = %req.method,
        host = %req.host,
        path = %req.path,
        "Request accepted"
    );

    let resp = state.dispatcher.dispatch(req).await;

    let mut out = WireResponse::new(Body::from(resp.body));
    *out.status_mut() = resp.status;
    *out.headers_mut() = resp.headers;
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        out.headers_mut().insert("x-request-id", value);
    }
    out
}
