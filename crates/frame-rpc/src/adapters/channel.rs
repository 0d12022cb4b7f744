//! Channel-backed transport for wiring sessions together in one process.
//!
//! Each frame gets its own `ChannelTransport`. Sends become `Delivery`
//! records on a shared tokio channel; a router task owns the receive side
//! and hands each delivery to the target's `Session::on_message`.

use crate::domain::types::{Endpoint, WindowId};
use crate::error::TransportError;
use crate::ports::Transport;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// One posted envelope, addressed and stamped with the sender's identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// The sending frame, as the receiver will see it.
    pub from: Endpoint,
    pub to: Endpoint,
    /// Origin of the sending frame.
    pub origin: String,
    pub envelope: Value,
    pub target_origin: Option<String>,
}

/// Windows that have been closed, shared by every transport on one router.
pub type ClosedWindows = Arc<RwLock<HashSet<WindowId>>>;

pub struct ChannelTransport {
    local: Endpoint,
    origin: String,
    tx: mpsc::UnboundedSender<Delivery>,
    closed: ClosedWindows,
    detached: AtomicBool,
}

impl ChannelTransport {
    pub fn new(
        local: Endpoint,
        origin: impl Into<String>,
        tx: mpsc::UnboundedSender<Delivery>,
        closed: ClosedWindows,
    ) -> Self {
        Self {
            local,
            origin: origin.into(),
            tx,
            closed,
            detached: AtomicBool::new(false),
        }
    }

    pub fn local(&self) -> Endpoint {
        self.local
    }
}

impl Transport for ChannelTransport {
    fn send(
        &self,
        target: Endpoint,
        envelope: Value,
        target_origin: Option<&str>,
    ) -> Result<(), TransportError> {
        if self.detached.load(Ordering::SeqCst) {
            return Err(TransportError::Detached);
        }
        let delivery = Delivery {
            from: self.local,
            to: target,
            origin: self.origin.clone(),
            envelope,
            target_origin: target_origin.map(str::to_string),
        };
        self.tx
            .send(delivery)
            .map_err(|_| TransportError::SendFailed("router stopped".into()))
    }

    fn is_closed(&self, window: WindowId) -> bool {
        self.closed.read().contains(&window)
    }

    fn detach(&self) {
        debug!(local = %self.local, "Channel transport detached");
        self.detached.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_delivery_carries_sender_identity() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let closed = ClosedWindows::default();
        let transport =
            ChannelTransport::new(Endpoint::Window(WindowId(3)), "https://www.example.com", tx, closed.clone());

        transport
            .send(Endpoint::Host, json!({ "id": null, "func": "ping", "args": [] }), None)
            .unwrap();
        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.from, Endpoint::Window(WindowId(3)));
        assert_eq!(delivery.to, Endpoint::Host);
        assert_eq!(delivery.origin, "https://www.example.com");

        closed.write().insert(WindowId(9));
        assert!(transport.is_closed(WindowId(9)));
    }

    #[test]
    fn test_send_after_router_stops_fails() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let transport = ChannelTransport::new(Endpoint::Host, "https://teams.microsoft.com", tx, ClosedWindows::default());
        assert!(matches!(
            transport.send(Endpoint::Host, json!({}), None),
            Err(TransportError::SendFailed(_))
        ));
    }
}
