//! Flat per-host template table with method and content-type overloading.
//!
//! # Responsibilities
//! - Store compiled URL templates per hostname (or the `*` wildcard host)
//! - Bind handlers per HTTP method, optionally per content type
//! - Select the highest-priority matching template for a request
//! - Negotiate the response content type against the caller's accept list
//!
//! # Design Decisions
//! - Priority: specificity first, then fewer parameters, then declaration
//!   order (first registration wins remaining ties)
//! - "Method present but no acceptable content type" is distinct from
//!   "method absent" (406 vs 405 downstream)

use std::cmp::Reverse;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use axum::http::Method;
use dashmap::DashMap;

use crate::http::handler::HandlerRef;
use crate::routing::resolver::RequestHandle;
use crate::routing::template::UrlTemplate;
use crate::routing::{RoutingError, WILDCARD_HOST};

/// Handler bound to one response content type.
#[derive(Clone)]
pub struct ContentTypeBinding {
    pub content_type: String,
    pub handler: HandlerRef,
}

/// Handlers registered for one HTTP method on one template.
#[derive(Clone, Default)]
pub struct MethodBinding {
    /// Fallback used when no content-type binding satisfies the request.
    pub default_handler: Option<HandlerRef>,

    /// Content-type bindings in registration order.
    pub content_types: Vec<ContentTypeBinding>,
}

impl MethodBinding {
    /// Pick a handler for the caller's accept list.
    ///
    /// Returns `None` when content-type bindings exist, none of them match,
    /// and there is no method-level default: the method is present but
    /// unsatisfiable.
    fn negotiate(&self, accept: &[String]) -> Option<HandlerRef> {
        if self.content_types.is_empty() {
            return self.default_handler.clone();
        }
        if accept.is_empty() {
            // Client stated no preference; first binding wins.
            return Some(self.content_types[0].handler.clone());
        }
        for wanted in accept {
            if wanted == "*/*" {
                return Some(self.content_types[0].handler.clone());
            }
            if let Some(prefix) = wanted.strip_suffix("/*") {
                if let Some(b) = self
                    .content_types
                    .iter()
                    .find(|b| b.content_type.starts_with(prefix) && b.content_type[prefix.len()..].starts_with('/'))
                {
                    return Some(b.handler.clone());
                }
                continue;
            }
            if let Some(b) = self.content_types.iter().find(|b| &b.content_type == wanted) {
                return Some(b.handler.clone());
            }
        }
        self.default_handler.clone()
    }
}

/// One registered template plus its per-method bindings.
struct TemplateRoute {
    template: UrlTemplate,
    /// Declaration order, used as the final tie-breaker.
    order: usize,
    methods: DashMap<Method, MethodBinding>,
}

/// Routes registered for one hostname.
#[derive(Default)]
struct HostTable {
    routes: RwLock<Vec<Arc<TemplateRoute>>>,
}

/// Per-hostname collection of URL templates.
pub struct TemplateTable {
    hosts: DashMap<String, Arc<HostTable>>,
    next_order: AtomicUsize,
}

impl TemplateTable {
    pub fn new() -> Self {
        Self {
            hosts: DashMap::new(),
            next_order: AtomicUsize::new(0),
        }
    }

    /// True if no template is registered for any host.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Register a handler for (host, method, template), optionally bound to
    /// one response content type. Re-registering the same (method, content
    /// type) replaces the previous handler.
    pub fn add_method_callback(
        &self,
        host: &str,
        method: Method,
        template: &str,
        content_type: Option<&str>,
        handler: HandlerRef,
    ) -> Result<(), RoutingError> {
        let host_table = self
            .hosts
            .entry(host.to_ascii_lowercase())
            .or_default()
            .clone();

        let route = {
            let mut routes = host_table
                .routes
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match routes.iter().find(|r| r.template.pattern() == template) {
                Some(existing) => existing.clone(),
                None => {
                    let compiled = UrlTemplate::compile(template)?;
                    let route = Arc::new(TemplateRoute {
                        template: compiled,
                        order: self.next_order.fetch_add(1, Ordering::Relaxed),
                        methods: DashMap::new(),
                    });
                    routes.push(route.clone());
                    route
                }
            }
        };

        let mut binding = route.methods.entry(method).or_default();
        match content_type {
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                if let Some(existing) = binding
                    .content_types
                    .iter_mut()
                    .find(|b| b.content_type == ct)
                {
                    existing.handler = handler;
                } else {
                    binding.content_types.push(ContentTypeBinding {
                        content_type: ct,
                        handler,
                    });
                }
            }
            None => binding.default_handler = Some(handler),
        }
        Ok(())
    }

    /// Resolve a request against the table. Pure lookup.
    pub fn lookup(
        &self,
        host: &str,
        path: &str,
        method: &Method,
        accept: &[String],
    ) -> RequestHandle {
        let host_table = match self
            .hosts
            .get(host)
            .or_else(|| self.hosts.get(WILDCARD_HOST))
        {
            Some(t) => t.clone(),
            None => {
                return RequestHandle::NotFound {
                    reason: RoutingError::UnknownHost {
                        host: host.to_string(),
                    }
                    .to_string(),
                }
            }
        };

        let routes = host_table
            .routes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // All templates whose pattern matches the path, with captures.
        let matching: Vec<(&Arc<TemplateRoute>, Vec<String>)> = routes
            .iter()
            .filter_map(|r| r.template.match_path(path).map(|params| (r, params)))
            .collect();

        if matching.is_empty() {
            return RequestHandle::NotFound {
                reason: RoutingError::NoMatchingTemplate {
                    path: path.to_string(),
                }
                .to_string(),
            };
        }

        let mut candidates: Vec<(&Arc<TemplateRoute>, Vec<String>)> = matching
            .into_iter()
            .filter(|(r, _)| r.methods.contains_key(method))
            .collect();

        if candidates.is_empty() {
            return RequestHandle::MethodNotAllowed;
        }

        candidates.sort_by_key(|(r, _)| {
            (
                Reverse(r.template.specificity()),
                r.template.param_count(),
                r.order,
            )
        });
        let (route, params) = candidates.swap_remove(0);

        let binding = match route.methods.get(method) {
            Some(b) => b.clone(),
            None => return RequestHandle::MethodNotAllowed,
        };

        match binding.negotiate(accept) {
            Some(handler) => RequestHandle::Handler { handler, params },
            None => RequestHandle::NotAcceptable,
        }
    }
}

impl Default for TemplateTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handler::{handler, HandlerRef};
    use crate::http::request::Request;
    use crate::http::response::Response;
    use axum::http::StatusCode;

    fn tagged(tag: &'static str) -> HandlerRef {
        handler(move |_req: Request| async move { Ok(Response::text(StatusCode::OK, tag)) })
    }

    async fn invoke(handle: RequestHandle) -> String {
        match handle {
            RequestHandle::Handler { handler, params } => {
                let mut req = Request::new(Method::GET, "example.com", "/");
                req.path_parameters = params;
                let resp = handler.call(req).await.unwrap();
                String::from_utf8(resp.body.to_vec()).unwrap()
            }
            other => panic!("expected handler, got {:?}", other),
        }
    }

    #[test]
    fn unknown_host_is_not_found() {
        let table = TemplateTable::new();
        table
            .add_method_callback("example.com", Method::GET, "/a", None, tagged("a"))
            .unwrap();
        let handle = table.lookup("other.com", "/a", &Method::GET, &[]);
        assert!(matches!(handle, RequestHandle::NotFound { .. }));
    }

    #[test]
    fn wildcard_host_catches_all() {
        let table = TemplateTable::new();
        table
            .add_method_callback("*", Method::GET, "/a", None, tagged("a"))
            .unwrap();
        let handle = table.lookup("whatever.example", "/a", &Method::GET, &[]);
        assert!(matches!(handle, RequestHandle::Handler { .. }));
    }

    #[test]
    fn method_absent_is_distinct_from_path_absent() {
        let table = TemplateTable::new();
        table
            .add_method_callback("*", Method::GET, "/items", None, tagged("get"))
            .unwrap();
        assert!(matches!(
            table.lookup("h", "/items", &Method::POST, &[]),
            RequestHandle::MethodNotAllowed
        ));
        assert!(matches!(
            table.lookup("h", "/nope", &Method::POST, &[]),
            RequestHandle::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn literal_template_beats_parameterized() {
        let table = TemplateTable::new();
        table
            .add_method_callback("*", Method::GET, "/items/{id}", None, tagged("param"))
            .unwrap();
        table
            .add_method_callback("*", Method::GET, "/items/special", None, tagged("literal"))
            .unwrap();

        let body = invoke(table.lookup("h", "/items/special", &Method::GET, &[])).await;
        assert_eq!(body, "literal");

        let body = invoke(table.lookup("h", "/items/42", &Method::GET, &[])).await;
        assert_eq!(body, "param");
    }

    #[test]
    fn parameters_extracted_in_template_order() {
        let table = TemplateTable::new();
        table
            .add_method_callback(
                "*",
                Method::GET,
                "/users/{id}/posts/{post}",
                None,
                tagged("x"),
            )
            .unwrap();
        match table.lookup("h", "/users/9/posts/3", &Method::GET, &[]) {
            RequestHandle::Handler { params, .. } => {
                assert_eq!(params, vec!["9".to_string(), "3".to_string()]);
            }
            other => panic!("expected handler, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn content_negotiation_follows_accept_order() {
        let table = TemplateTable::new();
        table
            .add_method_callback("*", Method::GET, "/data", Some("application/json"), tagged("json"))
            .unwrap();
        table
            .add_method_callback("*", Method::GET, "/data", Some("text/csv"), tagged("csv"))
            .unwrap();

        let accept = vec!["text/csv".to_string(), "application/json".to_string()];
        let body = invoke(table.lookup("h", "/data", &Method::GET, &accept)).await;
        assert_eq!(body, "csv");

        // */* picks the first registered binding
        let any = vec!["*/*".to_string()];
        let body = invoke(table.lookup("h", "/data", &Method::GET, &any)).await;
        assert_eq!(body, "json");
    }

    #[test]
    fn unsatisfiable_content_type_is_not_acceptable() {
        let table = TemplateTable::new();
        table
            .add_method_callback("*", Method::GET, "/data", Some("application/json"), tagged("json"))
            .unwrap();
        let accept = vec!["image/png".to_string()];
        assert!(matches!(
            table.lookup("h", "/data", &Method::GET, &accept),
            RequestHandle::NotAcceptable
        ));
    }

    #[tokio::test]
    async fn method_default_backs_up_content_bindings() {
        let table = TemplateTable::new();
        table
            .add_method_callback("*", Method::GET, "/data", Some("application/json"), tagged("json"))
            .unwrap();
        table
            .add_method_callback("*", Method::GET, "/data", None, tagged("default"))
            .unwrap();
        let accept = vec!["image/png".to_string()];
        let body = invoke(table.lookup("h", "/data", &Method::GET, &accept)).await;
        assert_eq!(body, "default");
    }

    #[tokio::test]
    async fn type_wildcard_accept_matches_subtype() {
        let table = TemplateTable::new();
        table
            .add_method_callback("*", Method::GET, "/data", Some("text/html"), tagged("html"))
            .unwrap();
        let accept = vec!["text/*".to_string()];
        let body = invoke(table.lookup("h", "/data", &Method::GET, &accept)).await;
        assert_eq!(body, "html");
    }
}
