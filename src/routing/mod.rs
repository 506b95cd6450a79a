//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, method, accept)
//!     → resolver.rs (route tree first, template table as fallback)
//!     → tree.rs (walk path segments, delegate to mounted sub-APIs)
//!     → table.rs (regex template match, method + content negotiation)
//!     → Return: RequestHandle (handler + params, or explicit miss)
//!
//! Registration (during warm-up, may interleave with lookups):
//!     add_api(host, mount_path, api)         → tree.rs
//!     add_method_callback(host, method, ...)  → template.rs + table.rs
//! ```
//!
//! # Design Decisions
//! - Registration and resolution share concurrency-safe maps (dashmap);
//!   callers never take locks
//! - Lookups are pure reads; same input always yields the same handle
//! - Tree and table are unified behind one resolver, tree consulted first

pub mod resolver;
pub mod table;
pub mod template;
pub mod tree;

pub use resolver::{Api, RequestHandle, Router};
pub use table::{ContentTypeBinding, MethodBinding, TemplateTable};
pub use template::UrlTemplate;
pub use tree::{RouteNode, RouteTree};

use thiserror::Error;

/// Hostname key used when a registration applies to every host.
pub const WILDCARD_HOST: &str = "*";

/// Errors surfaced by the routing subsystem.
///
/// Lookup outcomes (unknown host/path, method mismatch) are converted by the
/// dispatch loop into 404/405/406 responses and never escape the engine.
/// Registration errors (`DuplicateRegistration`, `InvalidTemplate`) surface
/// synchronously to the caller performing configuration.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("unknown host {host:?}")]
    UnknownHost { host: String },

    #[error("unknown path segment {segment:?}")]
    UnknownPathSegment { segment: String },

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("no template matches {path:?}")]
    NoMatchingTemplate { path: String },

    #[error("an API is already mounted at {host}{path}")]
    DuplicateRegistration { host: String, path: String },

    #[error("invalid URL template {template:?}: {reason}")]
    InvalidTemplate { template: String, reason: String },
}
