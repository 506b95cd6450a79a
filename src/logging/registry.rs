//! Registry of named log events and their group tags.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use crate::logging::event::{LogEvent, LogTarget};
use crate::logging::sink::SinkHub;

/// Registration-time errors of the logging subsystem.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("log event {name:?} is already registered")]
    DuplicateEvent { name: String },
}

/// Named request/response log events with group-tag fan-out.
///
/// Independent from the ambient `tracing` output: events only produce sink
/// messages while at least one target is subscribed.
pub struct EventRegistry {
    events: DashMap<String, Arc<LogEvent>>,
    groups: DashMap<String, Vec<String>>,
    hub: Arc<SinkHub>,
}

impl EventRegistry {
    pub fn new(hub: Arc<SinkHub>) -> Self {
        Self {
            events: DashMap::new(),
            groups: DashMap::new(),
            hub,
        }
    }

    /// The sink hub events write through.
    pub fn hub(&self) -> &Arc<SinkHub> {
        &self.hub
    }

    /// Register a new event. Duplicate names are a configuration error.
    pub fn register_event(
        &self,
        path: &str,
        context: &str,
        name: &str,
        groups: &[&str],
    ) -> Result<Arc<LogEvent>, LoggingError> {
        use dashmap::mapref::entry::Entry;
        let event = match self.events.entry(name.to_string()) {
            Entry::Occupied(_) => {
                return Err(LoggingError::DuplicateEvent {
                    name: name.to_string(),
                })
            }
            Entry::Vacant(slot) => {
                let event = Arc::new(LogEvent::new(path, context, name, groups, self.hub.clone()));
                slot.insert(event.clone());
                event
            }
        };
        for group in groups {
            self.groups
                .entry(group.to_string())
                .or_default()
                .push(name.to_string());
        }
        tracing::debug!(event = %name, groups = ?groups, "Log event registered");
        Ok(event)
    }

    /// Look up a registered event by name.
    pub fn get(&self, name: &str) -> Option<Arc<LogEvent>> {
        self.events.get(name).map(|e| e.clone())
    }

    /// Subscribe `target` on a single event, or on every event of a group
    /// when `name_or_group` is a group tag. Group form returns true only if
    /// every member succeeded; unknown names return false.
    pub fn debug(&self, name_or_group: &str, target: LogTarget) -> bool {
        self.apply(name_or_group, |event| event.subscribe(target))
    }

    /// Reverse of [`debug`](Self::debug).
    pub fn undebug(&self, name_or_group: &str, target: LogTarget) -> bool {
        self.apply(name_or_group, |event| event.unsubscribe(target))
    }

    fn apply<F>(&self, name_or_group: &str, op: F) -> bool
    where
        F: Fn(&LogEvent) -> bool,
    {
        if let Some(members) = self.groups.get(name_or_group) {
            let mut all = true;
            for name in members.iter() {
                match self.events.get(name) {
                    Some(event) => all &= op(&event),
                    None => all = false,
                }
            }
            return all;
        }
        match self.events.get(name_or_group) {
            Some(event) => op(&event),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> EventRegistry {
        let dir = std::env::temp_dir().join(format!("vhost-http-reg-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        EventRegistry::new(SinkHub::start(dir))
    }

    #[tokio::test]
    async fn duplicate_names_rejected() {
        let reg = registry();
        reg.register_event("/log", "server", "request", &[]).unwrap();
        assert!(matches!(
            reg.register_event("/log", "server", "request", &[]),
            Err(LoggingError::DuplicateEvent { .. })
        ));
    }

    #[tokio::test]
    async fn debug_by_name_targets_single_event() {
        let reg = registry();
        let ev = reg
            .register_event("/log", "server", "request", &["dispatch"])
            .unwrap();
        assert!(reg.debug("request", LogTarget::Console));
        assert!(ev.is_subscribed(LogTarget::Console));
    }

    #[tokio::test]
    async fn debug_by_group_targets_all_members() {
        let reg = registry();
        let a = reg
            .register_event("/log", "server", "request", &["dispatch"])
            .unwrap();
        let b = reg
            .register_event("/log", "server", "response", &["dispatch"])
            .unwrap();
        let other = reg.register_event("/log", "server", "other", &[]).unwrap();

        assert!(reg.debug("dispatch", LogTarget::Disc));
        assert!(a.is_subscribed(LogTarget::Disc));
        assert!(b.is_subscribed(LogTarget::Disc));
        assert!(!other.is_subscribed(LogTarget::Disc));

        assert!(reg.undebug("dispatch", LogTarget::Disc));
        assert!(!a.is_subscribed(LogTarget::Disc));
        assert!(!b.is_subscribed(LogTarget::Disc));
    }

    #[tokio::test]
    async fn unknown_name_returns_false() {
        let reg = registry();
        assert!(!reg.debug("missing", LogTarget::Console));
        assert!(!reg.undebug("missing", LogTarget::Console));
    }
}
