// Best-effort completion notification to embedding hosts.
// Any number of sinks (including none); a failing sink never affects the others.
// See DESIGN.md: Host Notification

use serde::Serialize;
use tracing::{debug, warn};

use crate::types::SessionOutcome;

/// Message delivered to every host sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "session_complete")]
pub struct CompletionMessage {
    pub outcome: SessionOutcome,
}

impl CompletionMessage {
    pub fn to_json(&self) -> String {
        // Plain struct of unit enums; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// One host-provided notification channel.
pub trait HostNotifier {
    fn name(&self) -> &str;
    fn notify(&self, message: &CompletionMessage) -> Result<(), String>;
}

/// Injected, possibly empty, set of notification sinks.
#[derive(Default)]
pub struct NotifierSet {
    sinks: Vec<Box<dyn HostNotifier>>,
}

impl NotifierSet {
    pub fn new() -> Self {
        NotifierSet { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Box<dyn HostNotifier>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Notify every sink; failures are logged and swallowed.
    /// Returns how many sinks accepted the message.
    pub fn notify_all(&self, message: &CompletionMessage) -> usize {
        if self.sinks.is_empty() {
            debug!("no host notifiers registered");
        }
        self.sinks
            .iter()
            .filter(|sink| match sink.notify(message) {
                Ok(()) => true,
                Err(reason) => {
                    warn!(sink = sink.name(), %reason, "host notification failed");
                    false
                }
            })
            .count()
    }
}
