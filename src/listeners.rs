//! Event fan-out: one `method` name maps to zero or more listener sinks.
//!
//! Unlike the generated command functions, listeners see the raw
//! `serde_json::Value` payload of an event — the supervisor never decodes
//! events itself (§4.1); callers decode with
//! `serde_json::from_value::<chrobot_protocol::page::FrameNavigatedEvent>(value)`
//! if they want a typed view.

use std::collections::HashMap;

use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use serde_json::Value;

/// Per-method sinks events are fanned out to.
#[derive(Debug, Default)]
pub struct EventListeners {
    sinks: HashMap<String, Vec<UnboundedSender<Value>>>,
}

impl EventListeners {
    pub fn new() -> Self {
        EventListeners::default()
    }

    /// Register a new listener for `method`, returning the receiving half.
    pub fn add(&mut self, method: impl Into<String>) -> UnboundedReceiver<Value> {
        let (tx, rx) = unbounded();
        self.sinks.entry(method.into()).or_default().push(tx);
        rx
    }

    /// Drop every listener registered for `method`.
    pub fn remove(&mut self, method: &str) {
        self.sinks.remove(method);
    }

    /// Fan `payload` out to every live listener on `method`. Sinks whose
    /// receiver has been dropped are pruned as they're discovered; a method
    /// with no listeners is simply a no-op, not an error.
    pub fn dispatch(&mut self, method: &str, payload: Value) {
        let Some(sinks) = self.sinks.get_mut(method) else {
            return;
        };
        sinks.retain(|tx| tx.unbounded_send(payload.clone()).is_ok());
        if sinks.is_empty() {
            self.sinks.remove(method);
        }
    }

    /// Number of distinct methods with at least one live listener.
    pub fn method_count(&self) -> usize {
        self.sinks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn dispatch_reaches_every_listener_on_the_method() {
        let mut listeners = EventListeners::new();
        let mut a = listeners.add("DOM.childNodeInserted");
        let mut b = listeners.add("DOM.childNodeInserted");
        let _other = listeners.add("Page.loadEventFired");

        listeners.dispatch("DOM.childNodeInserted", Value::from(1));

        assert_eq!(a.next().await, Some(Value::from(1)));
        assert_eq!(b.next().await, Some(Value::from(1)));
    }

    #[test]
    fn dispatch_to_unknown_method_is_a_no_op() {
        let mut listeners = EventListeners::new();
        listeners.dispatch("Nonexistent.event", Value::Null);
        assert_eq!(listeners.method_count(), 0);
    }

    #[tokio::test]
    async fn dropped_receiver_is_pruned_on_next_dispatch() {
        let mut listeners = EventListeners::new();
        let rx = listeners.add("Page.loadEventFired");
        drop(rx);
        listeners.dispatch("Page.loadEventFired", Value::Null);
        assert_eq!(listeners.method_count(), 0);
    }
}
