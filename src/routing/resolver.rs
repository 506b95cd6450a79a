//! Unified request resolution: route tree first, template table fallback.

use std::sync::Arc;

use axum::http::Method;

use crate::http::handler::HandlerRef;
use crate::routing::table::TemplateTable;
use crate::routing::tree::{RouteTree, TreeLookup};
use crate::routing::RoutingError;

/// A mountable sub-API: anything that can resolve a rebased path.
///
/// `Router` itself implements this, so independently built routers compose
/// under one server via `add_api`.
pub trait Api: Send + Sync {
    fn resolve(&self, path: &str, method: &Method, accept: &[String]) -> RequestHandle;
}

/// Resolver outcome for one request.
pub enum RequestHandle {
    /// A handler was found; `params` holds extracted path parameter values
    /// in template order.
    Handler {
        handler: HandlerRef,
        params: Vec<String>,
    },

    /// Nothing matches the path (unknown host, unknown segment, or no
    /// matching template). `reason` is the machine-readable explanation
    /// placed into the 404 body.
    NotFound { reason: String },

    /// The path is registered but not for this method (405).
    MethodNotAllowed,

    /// The method is registered but no content type satisfies the caller's
    /// accept list and no default exists (406).
    NotAcceptable,
}

impl std::fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Handler { params, .. } => f
                .debug_struct("Handler")
                .field("params", params)
                .finish_non_exhaustive(),
            Self::NotFound { reason } => {
                f.debug_struct("NotFound").field("reason", reason).finish()
            }
            Self::MethodNotAllowed => f.write_str("MethodNotAllowed"),
            Self::NotAcceptable => f.write_str("NotAcceptable"),
        }
    }
}

/// Virtual-hosting router: hierarchical mounts plus flat URL templates.
///
/// Registration may interleave with resolution; all shared state is in
/// concurrency-safe maps.
pub struct Router {
    tree: RouteTree,
    table: TemplateTable,
}

impl Router {
    pub fn new() -> Self {
        Self {
            tree: RouteTree::new(),
            table: TemplateTable::new(),
        }
    }

    /// Mount a sub-API at (host, mount_path) and hand it back for further
    /// registration. Fails if a different API is already bound at that node.
    pub fn add_api<A: Api + 'static>(
        &self,
        host: &str,
        mount_path: &str,
        api: Arc<A>,
    ) -> Result<Arc<A>, RoutingError> {
        self.tree.add_api(host, mount_path, api.clone())?;
        tracing::debug!(host = %host, mount = %mount_path, "API mounted");
        Ok(api)
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
        self.table
            .add_method_callback(host, method.clone(), template, content_type, handler)?;
        tracing::debug!(
            host = %host,
            method = %method,
            template = %template,
            content_type = content_type.unwrap_or("-"),
            "Route registered"
        );
        Ok(())
    }

    /// Resolve a request to a handler or an explicit miss.
    ///
    /// The tree is consulted first; a host with a tree never falls back to
    /// the template table.
    pub fn resolve(
        &self,
        host: &str,
        path: &str,
        method: &Method,
        accept: &[String],
    ) -> RequestHandle {
        match self.tree.lookup(host, path) {
            TreeLookup::Delegate { api, rebased_path } => {
                api.resolve(&rebased_path, method, accept)
            }
            TreeLookup::NoMatch { segment } => RequestHandle::NotFound {
                reason: RoutingError::UnknownPathSegment { segment }.to_string(),
            },
            TreeLookup::Empty => self.table.lookup(host, path, method, accept),
        }
    }
}

impl Api for Router {
    fn resolve(&self, path: &str, method: &Method, accept: &[String]) -> RequestHandle {
        // Sub-APIs resolve rebased paths against their own tables under the
        // wildcard host: the parent already performed host selection.
        Router::resolve(self, "*", path, method, accept)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handler::handler;
    use crate::http::request::Request;
    use crate::http::response::Response;
    use axum::http::StatusCode;

    fn ok_handler() -> HandlerRef {
        handler(|_req: Request| async move { Ok(Response::new(StatusCode::OK)) })
    }

    #[test]
    fn tree_takes_precedence_over_table_for_same_host() {
        let root = Router::new();
        let sub = Arc::new(Router::new());
        sub.add_method_callback("*", Method::GET, "/users", None, ok_handler())
            .unwrap();
        root.add_api("example.com", "/api/v1", sub).unwrap();

        // Flat registration on the same host is shadowed by the tree.
        root.add_method_callback("example.com", Method::GET, "/flat", None, ok_handler())
            .unwrap();

        assert!(matches!(
            root.resolve("example.com", "/api/v1/users", &Method::GET, &[]),
            RequestHandle::Handler { .. }
        ));
        assert!(matches!(
            root.resolve("example.com", "/flat", &Method::GET, &[]),
            RequestHandle::NotFound { .. }
        ));
    }

    #[test]
    fn composition_delegates_with_rebased_path() {
        let root = Router::new();
        let sub = Arc::new(Router::new());
        sub.add_method_callback("*", Method::GET, "/users/{id}", None, ok_handler())
            .unwrap();
        root.add_api("example.com", "/api/v1", sub).unwrap();

        match root.resolve("example.com", "/api/v1/users/5", &Method::GET, &[]) {
            RequestHandle::Handler { params, .. } => assert_eq!(params, vec!["5".to_string()]),
            other => panic!("expected handler, got {:?}", other),
        }
    }

    #[test]
    fn host_without_tree_uses_template_table() {
        let root = Router::new();
        let sub = Arc::new(Router::new());
        root.add_api("api.example.com", "/", sub).unwrap();
        root.add_method_callback("web.example.com", Method::GET, "/page", None, ok_handler())
            .unwrap();

        assert!(matches!(
            root.resolve("web.example.com", "/page", &Method::GET, &[]),
            RequestHandle::Handler { .. }
        ));
    }

    #[test]
    fn resolution_is_deterministic() {
        let root = Router::new();
        root.add_method_callback("*", Method::GET, "/a/{x}", None, ok_handler())
            .unwrap();
        root.add_method_callback("*", Method::GET, "/a/b", None, ok_handler())
            .unwrap();

        for _ in 0..10 {
            match root.resolve("h", "/a/b", &Method::GET, &[]) {
                RequestHandle::Handler { params, .. } => assert!(params.is_empty()),
                other => panic!("expected handler, got {:?}", other),
            }
        }
    }
}
