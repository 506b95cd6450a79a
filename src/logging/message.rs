//! Immutable log records flowing through the sink channels.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::http::request::Request;
use crate::http::response::Response;

/// Which sink channel a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Request,
    Response,
}

/// One request- or response-logged record.
///
/// Enqueued exactly once; consumed exactly once by the owning channel's
/// background task.
#[derive(Debug, Clone)]
pub struct LogMessage {
    /// Logging path of the emitting event (directory-style grouping).
    pub path: String,

    /// Context string of the emitting event.
    pub context: String,

    /// Event name.
    pub event: String,

    /// The dispatched request, shared with the serving path.
    pub request: Arc<Request>,

    /// Present on response-logged records only.
    pub response: Option<Response>,

    /// Enqueue time.
    pub timestamp: DateTime<Utc>,
}

impl LogMessage {
    pub fn request(path: &str, context: &str, event: &str, request: Arc<Request>) -> Self {
        Self {
            path: path.to_string(),
            context: context.to_string(),
            event: event.to_string(),
            request,
            response: None,
            timestamp: Utc::now(),
        }
    }

    pub fn response(
        path: &str,
        context: &str,
        event: &str,
        request: Arc<Request>,
        response: Response,
    ) -> Self {
        Self {
            path: path.to_string(),
            context: context.to_string(),
            event: event.to_string(),
            request,
            response: Some(response),
            timestamp: Utc::now(),
        }
    }

    pub fn kind(&self) -> MessageKind {
        if self.response.is_some() {
            MessageKind::Response
        } else {
            MessageKind::Request
        }
    }

    /// One formatted line, shared by the console and disc sinks.
    pub fn format_line(&self) -> String {
        match &self.response {
            Some(resp) => format!(
                "{} [{}/{}] {} {} -> {}",
                self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                self.context,
                self.event,
                self.request.id,
                self.request.request_line(),
                resp.status
            ),
            None => format!(
                "{} [{}/{}] {} {}",
                self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                self.context,
                self.event,
                self.request.id,
                self.request.request_line()
            ),
        }
    }
}
