//! Correlation table - maps outbound call ids to their waiting completions.
//!
//! Flow:
//! 1. Caller allocates an id and calls `register()` with a completion
//! 2. The request goes out carrying that id
//! 3. Inbound responses are handed to `dispatch()`
//! 4. Partials are forwarded and the entry stays; the first final is
//!    forwarded and the entry is removed
//!
//! Ids are never reused, so a late duplicate of a resolved reply can never
//! match a newer call.

use crate::domain::envelope::Reply;
use crate::domain::types::WindowId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Correlation id carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic id source, one per session.
#[derive(Debug)]
pub struct IdAllocator {
    base: u64,
    next: u64,
}

impl IdAllocator {
    pub fn new(base: u64) -> Self {
        Self { base, next: base }
    }

    pub fn next_id(&mut self) -> MessageId {
        let id = MessageId(self.next);
        self.next += 1;
        id
    }

    /// Whether `id` was handed out by this allocator at some point.
    pub fn has_issued(&self, id: MessageId) -> bool {
        id.0 >= self.base && id.0 < self.next
    }
}

/// Where the replies for a pending call go.
#[derive(Debug)]
pub enum Completion {
    /// A local caller awaiting a reply stream.
    Local(mpsc::UnboundedSender<Reply>),
    /// A request forwarded on behalf of a child; replies are relayed down
    /// under the child's own id.
    Relay {
        child: WindowId,
        child_id: MessageId,
    },
    /// The `initialize` call; its final reply settles the handshake.
    Handshake,
}

struct PendingCall {
    func: String,
    completion: Completion,
    partials: u64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("correlation id {0} is already pending")]
pub struct DuplicateIdError(pub MessageId);

/// What `dispatch()` did with a response.
#[derive(Debug, PartialEq)]
pub enum DispatchOutcome {
    /// Delivered to a local caller; `last` is set when the call is finished.
    Delivered { func: String, last: bool },
    /// Must be relayed to a child by the caller of `dispatch()`.
    Relay {
        func: String,
        child: WindowId,
        child_id: MessageId,
        reply: Reply,
    },
    /// Reply to the `initialize` call.
    Handshake { reply: Reply },
    /// No pending call had this id.
    Unknown,
}

/// Pending calls keyed by correlation id.
#[derive(Default)]
pub struct CorrelationTable {
    pending: HashMap<MessageId, PendingCall>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new pending call.
    pub fn register(
        &mut self,
        id: MessageId,
        func: impl Into<String>,
        completion: Completion,
    ) -> Result<(), DuplicateIdError> {
        if self.pending.contains_key(&id) {
            return Err(DuplicateIdError(id));
        }
        let func = func.into();
        debug!(id = %id, func = %func, "Registered pending call");
        self.pending.insert(
            id,
            PendingCall {
                func,
                completion,
                partials: 0,
            },
        );
        Ok(())
    }

    /// Route a reply to its pending call.
    pub fn dispatch(&mut self, id: MessageId, reply: Reply) -> DispatchOutcome {
        let is_final = !reply.is_partial();

        let Some(call) = self.pending.get_mut(&id) else {
            return DispatchOutcome::Unknown;
        };
        if !is_final {
            call.partials += 1;
        }

        let outcome = match &call.completion {
            Completion::Local(sender) => {
                // A dropped receiver means the caller stopped listening; the
                // entry still resolves normally.
                let _ = sender.send(reply);
                DispatchOutcome::Delivered {
                    func: call.func.clone(),
                    last: is_final,
                }
            }
            Completion::Relay { child, child_id } => DispatchOutcome::Relay {
                func: call.func.clone(),
                child: *child,
                child_id: *child_id,
                reply,
            },
            Completion::Handshake => DispatchOutcome::Handshake { reply },
        };

        if is_final {
            if let Some(call) = self.pending.remove(&id) {
                debug!(
                    id = %id,
                    func = %call.func,
                    partials = call.partials,
                    "Resolved pending call"
                );
            }
        }
        outcome
    }

    /// Remove a call without resolving it.
    pub fn cancel(&mut self, id: MessageId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Drop every pending call. Local callers observe a closed stream.
    pub fn clear(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn is_pending(&self, id: MessageId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
