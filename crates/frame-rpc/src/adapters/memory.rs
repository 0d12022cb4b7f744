//! Recording transport.

use crate::domain::types::{Endpoint, WindowId};
use crate::error::TransportError;
use crate::ports::Transport;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

/// One envelope handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub target: Endpoint,
    pub envelope: Value,
    pub target_origin: Option<String>,
}

impl SentMessage {
    pub fn func(&self) -> Option<&str> {
        self.envelope.get("func").and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<u64> {
        self.envelope.get("id").and_then(Value::as_u64)
    }

    pub fn args(&self) -> &[Value] {
        self.envelope
            .get("args")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_partial_response(&self) -> bool {
        self.envelope
            .get("isPartialResponse")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Transport that keeps every send in memory.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    sent: Mutex<Vec<SentMessage>>,
    closed: Mutex<HashSet<WindowId>>,
    detached: AtomicBool,
    failing: AtomicBool,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn messages_to(&self, target: Endpoint) -> Vec<SentMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|message| message.target == target)
            .cloned()
            .collect()
    }

    /// Most recent request carrying `func`.
    pub fn find_request(&self, func: &str) -> Option<SentMessage> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|message| message.func() == Some(func))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }

    /// Mark `window` as closed; later sends to it are skipped by the session.
    pub fn close_window(&self, window: WindowId) {
        self.closed.lock().insert(window);
    }

    /// Make every following send fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }
}

impl Transport for InMemoryTransport {
    fn send(
        &self,
        target: Endpoint,
        envelope: Value,
        target_origin: Option<&str>,
    ) -> Result<(), TransportError> {
        if self.is_detached() {
            return Err(TransportError::Detached);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed(format!("{target} unreachable")));
        }
        self.sent.lock().push(SentMessage {
            target,
            envelope,
            target_origin: target_origin.map(str::to_string),
        });
        Ok(())
    }

    fn is_closed(&self, window: WindowId) -> bool {
        self.closed.lock().contains(&window)
    }

    fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_and_filters() {
        let transport = InMemoryTransport::new();
        transport
            .send(Endpoint::Host, json!({ "id": 0, "func": "initialize", "args": ["1.0"] }), None)
            .unwrap();
        transport
            .send(
                Endpoint::Window(WindowId(2)),
                json!({ "id": 5, "args": [], "isPartialResponse": true }),
                Some("https://www.example.com"),
            )
            .unwrap();

        assert_eq!(transport.len(), 2);
        assert_eq!(transport.find_request("initialize").unwrap().id(), Some(0));
        let child = transport.messages_to(Endpoint::Window(WindowId(2)));
        assert_eq!(child.len(), 1);
        assert!(child[0].is_partial_response());
        assert_eq!(child[0].target_origin.as_deref(), Some("https://www.example.com"));
    }

    #[test]
    fn test_detached_rejects_sends() {
        let transport = InMemoryTransport::new();
        transport.detach();
        assert_eq!(
            transport.send(Endpoint::Host, json!({}), None),
            Err(TransportError::Detached)
        );
        assert!(transport.is_empty());
    }

    #[test]
    fn test_closed_windows() {
        let transport = InMemoryTransport::new();
        transport.close_window(WindowId(4));
        assert!(transport.is_closed(WindowId(4)));
        assert!(!transport.is_closed(WindowId(5)));
    }
}
