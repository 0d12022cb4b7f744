//! Outbound queue for messages issued before the handshake completes.

use crate::domain::correlation::MessageId;
use crate::domain::envelope::{MessageRequest, MessageResponse};
use crate::domain::types::Endpoint;
use std::collections::VecDeque;
use thiserror::Error;

/// A message waiting for transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub target: Endpoint,
    pub message: OutboundMessage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Request(MessageRequest),
    Response(MessageResponse),
}

impl OutboundMessage {
    pub fn label(&self) -> &str {
        match self {
            OutboundMessage::Request(req) => &req.func,
            OutboundMessage::Response(_) => "response",
        }
    }

    /// Correlation id of an outgoing call, if this is one.
    pub fn call_id(&self) -> Option<MessageId> {
        match self {
            OutboundMessage::Request(req) => req.id,
            OutboundMessage::Response(_) => None,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("outbound queue is full ({capacity} messages)")]
pub struct QueueFull {
    pub capacity: usize,
}

/// FIFO of pre-handshake messages, optionally bounded.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    entries: VecDeque<Outbound>,
    capacity: Option<usize>,
}

impl OutboundQueue {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub fn enqueue(&mut self, outbound: Outbound) -> Result<(), QueueFull> {
        if let Some(capacity) = self.capacity {
            if self.entries.len() >= capacity {
                return Err(QueueFull { capacity });
            }
        }
        self.entries.push_back(outbound);
        Ok(())
    }

    /// Empty the queue, returning entries in insertion order.
    pub fn drain(&mut self) -> Vec<Outbound> {
        self.entries.drain(..).collect()
    }

    /// Whether `count` more messages fit.
    pub fn has_room(&self, count: usize) -> bool {
        self.capacity
            .map_or(true, |capacity| self.entries.len() + count <= capacity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: u64, func: &str) -> Outbound {
        Outbound {
            target: Endpoint::Host,
            message: OutboundMessage::Request(MessageRequest::call(MessageId(id), func, vec![])),
        }
    }

    #[test]
    fn test_drain_is_fifo_and_empties() {
        let mut queue = OutboundQueue::new(None);
        queue.enqueue(call(1, "a")).unwrap();
        queue.enqueue(call(2, "b")).unwrap();
        queue.enqueue(call(3, "c")).unwrap();

        let labels: Vec<_> = queue
            .drain()
            .iter()
            .map(|o| o.message.label().to_string())
            .collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_bounded_queue_rejects_overflow() {
        let mut queue = OutboundQueue::new(Some(1));
        queue.enqueue(call(1, "a")).unwrap();
        assert_eq!(queue.enqueue(call(2, "b")), Err(QueueFull { capacity: 1 }));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_has_room_counts_what_is_already_queued() {
        let mut queue = OutboundQueue::new(Some(3));
        queue.enqueue(call(1, "a")).unwrap();
        assert!(queue.has_room(2));
        assert!(!queue.has_room(3));
        assert!(OutboundQueue::new(None).has_room(usize::MAX));
    }

    #[test]
    fn test_call_id_only_for_calls() {
        assert_eq!(call(7, "a").message.call_id(), Some(MessageId(7)));
        let event = OutboundMessage::Request(MessageRequest::event("ping", vec![]));
        assert_eq!(event.call_id(), None);
    }
}
