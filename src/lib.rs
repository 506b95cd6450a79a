//! Embeddable virtual-hosting HTTP(S) server.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                 VHOST-HTTP                      │
//!                      │                                                 │
//!   Client Request     │  ┌─────────┐   ┌──────────┐   ┌─────────────┐  │
//!   ───────────────────┼─▶│  http   │──▶│ dispatch │──▶│   routing   │  │
//!                      │  │ adapter │   │   loop   │   │ tree+table  │  │
//!                      │  └─────────┘   └────┬─────┘   └──────┬──────┘  │
//!                      │                     │                │         │
//!   Client Response    │                     ▼                ▼         │
//!   ◀──────────────────┼───────────── handler invocation ───────        │
//!                      │                     │                          │
//!                      │                     ▼ (enqueue only)           │
//!                      │  ┌──────────────────────────────────────────┐  │
//!                      │  │ logging: events → sinks (console, disc,  │  │
//!                      │  │ network/SSE transports), one consumer    │  │
//!                      │  │ task per channel                         │  │
//!                      │  └──────────────────────────────────────────┘  │
//!                      │                                                 │
//!                      │  Cross-cutting: config, observability,          │
//!                      │  lifecycle (startup/shutdown)                   │
//!                      └────────────────────────────────────────────────┘
//! ```
//!
//! Requests are matched in two tiers: a hierarchical route tree mounting
//! whole sub-APIs under (hostname, path), then a flat per-host table of
//! regex-compiled URL templates with method- and content-type-level
//! handler overloading. Every dispatched request can be observed through
//! named log events feeding asynchronous sinks that never add latency to
//! the serving path.

// Core subsystems
pub mod config;
pub mod dispatch;
pub mod http;
pub mod routing;

// Logging pipeline
pub mod logging;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use dispatch::{Dispatcher, FnStage, PipelineStage};
pub use http::{handler, HttpServer, Request, Response};
pub use lifecycle::Shutdown;
pub use logging::{EventRegistry, LogTarget, SinkHub};
pub use routing::{Router, RoutingError};
