//! Named log events with per-target subscriptions.

use std::sync::Arc;

use dashmap::DashSet;

use crate::http::request::Request;
use crate::http::response::Response;
use crate::logging::message::LogMessage;
use crate::logging::sink::SinkHub;

/// A logging destination. Console and disc are written by the sink hub
/// itself; network and SSE go through caller-attached transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTarget {
    Console,
    Disc,
    Network,
    ServerSentEvents,
}

impl std::str::FromStr for LogTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "disc" => Ok(Self::Disc),
            "network" => Ok(Self::Network),
            "sse" => Ok(Self::ServerSentEvents),
            other => Err(format!("unknown log target {:?}", other)),
        }
    }
}

/// A named subscription point for request/response logging.
///
/// Created once per distinct name by the registry; mutated only through
/// [`subscribe`](LogEvent::subscribe) / [`unsubscribe`](LogEvent::unsubscribe).
pub struct LogEvent {
    path: String,
    context: String,
    name: String,
    groups: Vec<String>,
    active: DashSet<LogTarget>,
    hub: Arc<SinkHub>,
}

impl LogEvent {
    pub(crate) fn new(
        path: &str,
        context: &str,
        name: &str,
        groups: &[&str],
        hub: Arc<SinkHub>,
    ) -> Self {
        Self {
            path: path.to_string(),
            context: context.to_string(),
            name: name.to_string(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            active: DashSet::new(),
            hub,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Activate a target. Idempotent: subscribing an already-active target
    /// is a no-op that still reports success. The hub is only notified on
    /// an actual state transition.
    pub fn subscribe(&self, target: LogTarget) -> bool {
        if self.active.insert(target) {
            tracing::debug!(event = %self.name, target = ?target, "Log target subscribed");
        }
        true
    }

    /// Deactivate a target. Idempotent like [`subscribe`](Self::subscribe).
    pub fn unsubscribe(&self, target: LogTarget) -> bool {
        if self.active.remove(&target).is_some() {
            tracing::debug!(event = %self.name, target = ?target, "Log target unsubscribed");
        }
        true
    }

    pub fn is_subscribed(&self, target: LogTarget) -> bool {
        self.active.contains(&target)
    }

    /// Number of active targets.
    pub fn subscription_count(&self) -> usize {
        self.active.len()
    }

    /// Enqueue a request-logged message for every active target.
    /// Non-blocking.
    pub fn log_request(&self, request: &Arc<Request>) {
        if self.active.is_empty() {
            return;
        }
        for target in self.active.iter() {
            self.hub.enqueue(
                *target,
                LogMessage::request(&self.path, &self.context, &self.name, request.clone()),
            );
        }
    }

    /// Enqueue a response-logged message for every active target.
    /// Non-blocking.
    pub fn log_response(&self, request: &Arc<Request>, response: &Response) {
        if self.active.is_empty() {
            return;
        }
        for target in self.active.iter() {
            self.hub.enqueue(
                *target,
                LogMessage::response(
                    &self.path,
                    &self.context,
                    &self.name,
                    request.clone(),
                    response.clone(),
                ),
            );
        }
    }
}
