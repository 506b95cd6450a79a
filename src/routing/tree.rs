//! Hierarchical route tree for mounting sub-APIs.
//!
//! # Responsibilities
//! - Map (hostname, path segments) to mounted sub-APIs
//! - Walk a request path and hand off to the first mounted API, with the
//!   remaining path rebased below the mount point
//!
//! # Design Decisions
//! - Children live in a dashmap so registration can race with lookups
//! - The API slot is a `OnceLock`: binding is first-wins, a second bind at
//!   the same node is a registration error and leaves the first intact
//! - A child stored under `/` is a catch-all that any unmatched segment
//!   falls through to (registered with a `*` segment in the mount path)
//! - Rebasing strips the literal mount segments consumed during the walk;
//!   wildcard-matched segments stay in the delegated path so the mounted
//!   API can see what they matched

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::routing::resolver::Api;
use crate::routing::{RoutingError, WILDCARD_HOST};

/// Child name an unmatched segment falls through to.
const CATCH_ALL: &str = "/";

/// One path segment under a hostname.
pub struct RouteNode {
    children: DashMap<String, Arc<RouteNode>>,
    mount: OnceLock<Arc<dyn Api>>,
}

impl RouteNode {
    fn new() -> Self {
        Self {
            children: DashMap::new(),
            mount: OnceLock::new(),
        }
    }
}

/// Outcome of walking the tree for one request.
pub enum TreeLookup {
    /// No tree registered for this host; the caller falls back to the
    /// template table.
    Empty,

    /// A mounted API was reached; resolve `rebased_path` against it.
    Delegate {
        api: Arc<dyn Api>,
        rebased_path: String,
    },

    /// The host has a tree but the path left it at `segment`.
    NoMatch { segment: String },
}

/// Prefix tree keyed by (hostname, path segment).
pub struct RouteTree {
    hosts: DashMap<String, Arc<RouteNode>>,
}

impl RouteTree {
    pub fn new() -> Self {
        Self {
            hosts: DashMap::new(),
        }
    }

    /// Mount an API under (host, mount_path). A `*` segment mounts a
    /// catch-all that swallows any one segment and everything below it.
    pub fn add_api(
        &self,
        host: &str,
        mount_path: &str,
        api: Arc<dyn Api>,
    ) -> Result<(), RoutingError> {
        let host = host.to_ascii_lowercase();
        let mut node = self
            .hosts
            .entry(host.clone())
            .or_insert_with(|| Arc::new(RouteNode::new()))
            .clone();

        for segment in mount_path.split('/').filter(|s| !s.is_empty()) {
            let key = if segment == "*" {
                CATCH_ALL.to_string()
            } else {
                segment.to_string()
            };
            let child = node
                .children
                .entry(key)
                .or_insert_with(|| Arc::new(RouteNode::new()))
                .clone();
            node = child;
        }

        node.mount
            .set(api)
            .map_err(|_| RoutingError::DuplicateRegistration {
                host,
                path: mount_path.to_string(),
            })
    }

    /// Walk the tree for (host, path). Pure lookup.
    pub fn lookup(&self, host: &str, path: &str) -> TreeLookup {
        let root = match self
            .hosts
            .get(host)
            .or_else(|| self.hosts.get(WILDCARD_HOST))
        {
            Some(n) => n.clone(),
            None => return TreeLookup::Empty,
        };

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let mut node = root;
        // Segments matched by a catch-all child; kept in the rebased path.
        let mut wildcards: Vec<&str> = Vec::new();

        if let Some(found) = delegate(&node, &wildcards, &segments) {
            return found;
        }

        for (consumed, segment) in segments.iter().enumerate() {
            let (child, via_catch_all) = match node.children.get(*segment) {
                Some(c) => (c.clone(), false),
                None => match node.children.get(CATCH_ALL) {
                    Some(c) => (c.clone(), true),
                    None => {
                        return TreeLookup::NoMatch {
                            segment: segment.to_string(),
                        }
                    }
                },
            };
            node = child;
            if via_catch_all {
                wildcards.push(*segment);
            }
            if let Some(found) = delegate(&node, &wildcards, &segments[consumed + 1..]) {
                return found;
            }
        }

        // Path consumed without reaching a mounted API.
        TreeLookup::NoMatch {
            segment: path.to_string(),
        }
    }
}

/// Short-circuit at the first node carrying a bound API. The delegated path
/// is rebuilt from the wildcard-matched segments plus everything the walk
/// has not consumed yet; the mount's literal segments are gone.
fn delegate(node: &Arc<RouteNode>, wildcards: &[&str], remaining: &[&str]) -> Option<TreeLookup> {
    let api = node.mount.get()?;
    let mut rebased_path = String::new();
    for segment in wildcards.iter().chain(remaining) {
        rebased_path.push('/');
        rebased_path.push_str(segment);
    }
    if rebased_path.is_empty() {
        rebased_path.push('/');
    }
    Some(TreeLookup::Delegate {
        api: api.clone(),
        rebased_path,
    })
}

impl Default for RouteTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::resolver::RequestHandle;
    use axum::http::Method;

    /// Test API that records the path it was asked to resolve.
    struct EchoApi;

    impl Api for EchoApi {
        fn resolve(&self, path: &str, _method: &Method, _accept: &[String]) -> RequestHandle {
            RequestHandle::NotFound {
                reason: path.to_string(),
            }
        }
    }

    fn delegated_path(lookup: TreeLookup) -> String {
        match lookup {
            TreeLookup::Delegate { api, rebased_path } => {
                match api.resolve(&rebased_path, &Method::GET, &[]) {
                    RequestHandle::NotFound { reason } => reason,
                    _ => unreachable!(),
                }
            }
            TreeLookup::Empty => panic!("tree was empty"),
            TreeLookup::NoMatch { segment } => panic!("no match at {:?}", segment),
        }
    }

    #[test]
    fn mounted_api_receives_rebased_path() {
        let tree = RouteTree::new();
        tree.add_api("example.com", "/api/v1", Arc::new(EchoApi)).unwrap();

        let lookup = tree.lookup("example.com", "/api/v1/users");
        assert_eq!(delegated_path(lookup), "/users");
    }

    #[test]
    fn mount_root_delegates_everything() {
        let tree = RouteTree::new();
        tree.add_api("example.com", "/", Arc::new(EchoApi)).unwrap();

        let lookup = tree.lookup("example.com", "/anything/below");
        assert_eq!(delegated_path(lookup), "/anything/below");
    }

    #[test]
    fn duplicate_mount_rejected_first_stays_active() {
        let tree = RouteTree::new();
        tree.add_api("example.com", "/api", Arc::new(EchoApi)).unwrap();
        let err = tree.add_api("example.com", "/api", Arc::new(EchoApi));
        assert!(matches!(
            err,
            Err(RoutingError::DuplicateRegistration { .. })
        ));

        // First registration still resolves.
        let lookup = tree.lookup("example.com", "/api/users");
        assert_eq!(delegated_path(lookup), "/users");
    }

    #[test]
    fn sibling_mounts_coexist() {
        let tree = RouteTree::new();
        tree.add_api("example.com", "/api/v1", Arc::new(EchoApi)).unwrap();
        tree.add_api("example.com", "/api/v2", Arc::new(EchoApi)).unwrap();

        let lookup = tree.lookup("example.com", "/api/v2/users/1");
        assert_eq!(delegated_path(lookup), "/users/1");
    }

    #[test]
    fn unknown_segment_reports_no_match() {
        let tree = RouteTree::new();
        tree.add_api("example.com", "/api/v1", Arc::new(EchoApi)).unwrap();

        match tree.lookup("example.com", "/other/path") {
            TreeLookup::NoMatch { segment } => assert_eq!(segment, "other"),
            _ => panic!("expected NoMatch"),
        }
    }

    #[test]
    fn unregistered_host_is_empty() {
        let tree = RouteTree::new();
        tree.add_api("example.com", "/api", Arc::new(EchoApi)).unwrap();
        assert!(matches!(
            tree.lookup("other.com", "/api/users"),
            TreeLookup::Empty
        ));
    }

    #[test]
    fn wildcard_host_serves_any_host() {
        let tree = RouteTree::new();
        tree.add_api("*", "/api", Arc::new(EchoApi)).unwrap();
        let lookup = tree.lookup("whoever.example", "/api/x");
        assert_eq!(delegated_path(lookup), "/x");
    }

    #[test]
    fn catch_all_child_swallows_unmatched_segment() {
        let tree = RouteTree::new();
        tree.add_api("example.com", "/files/*", Arc::new(EchoApi)).unwrap();

        // "anything" has no exact child; falls through to the catch-all.
        let lookup = tree.lookup("example.com", "/files/anything");
        assert_eq!(delegated_path(lookup), "/anything");
    }

    #[test]
    fn interior_catch_all_mount_still_strips_literal_segments() {
        let tree = RouteTree::new();
        tree.add_api("example.com", "/a/*/c", Arc::new(EchoApi)).unwrap();

        // The literal mount segments "a" and "c" are stripped; the
        // wildcard-matched "x" and the tail remain.
        let lookup = tree.lookup("example.com", "/a/x/c/tail");
        assert_eq!(delegated_path(lookup), "/x/tail");

        // Exactly at the mount point there is nothing left but the
        // wildcard match.
        let lookup = tree.lookup("example.com", "/a/x/c");
        assert_eq!(delegated_path(lookup), "/x");
    }
}
