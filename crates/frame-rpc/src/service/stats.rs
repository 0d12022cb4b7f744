//! Session counters
//!
//! Thread-safe counters for traffic through one session. Dropped messages are
//! fail-silent on the wire, so these are the only record of how many were
//! discarded and why.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one session
#[derive(Debug, Default)]
pub struct SessionStats {
    /// Requests and events written to the transport
    pub messages_sent: AtomicU64,
    /// Messages held back until the handshake completed
    pub messages_queued: AtomicU64,
    /// Final replies delivered to local callers
    pub replies_resolved: AtomicU64,
    /// Partial replies delivered to local callers
    pub partials_delivered: AtomicU64,
    /// Inbound messages from origins outside the trusted set
    pub untrusted_dropped: AtomicU64,
    /// Inbound messages that were not a request or response
    pub malformed_dropped: AtomicU64,
    /// Replies whose id was never issued by this session
    pub unknown_replies: AtomicU64,
    /// Replies for an id that has already resolved
    pub stale_replies: AtomicU64,
    /// Child requests forwarded to the parent
    pub relayed_to_parent: AtomicU64,
    /// Parent messages relayed down to children
    pub relayed_to_children: AtomicU64,
    /// Local handler invocations
    pub handler_invocations: AtomicU64,
    /// Handler calls refused because the args did not match
    pub invalid_args_dropped: AtomicU64,
    /// Requests nobody handled or forwarded
    pub unhandled_requests: AtomicU64,
    /// Sends skipped because the child window had closed
    pub closed_window_drops: AtomicU64,
    /// Transport send failures
    pub transport_errors: AtomicU64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Get current counters snapshot
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            messages_sent: load(&self.messages_sent),
            messages_queued: load(&self.messages_queued),
            replies_resolved: load(&self.replies_resolved),
            partials_delivered: load(&self.partials_delivered),
            untrusted_dropped: load(&self.untrusted_dropped),
            malformed_dropped: load(&self.malformed_dropped),
            unknown_replies: load(&self.unknown_replies),
            stale_replies: load(&self.stale_replies),
            relayed_to_parent: load(&self.relayed_to_parent),
            relayed_to_children: load(&self.relayed_to_children),
            handler_invocations: load(&self.handler_invocations),
            invalid_args_dropped: load(&self.invalid_args_dropped),
            unhandled_requests: load(&self.unhandled_requests),
            closed_window_drops: load(&self.closed_window_drops),
            transport_errors: load(&self.transport_errors),
        }
    }

    /// Total inbound messages discarded for any reason
    pub fn total_dropped(&self) -> u64 {
        self.snapshot().total_dropped()
    }
}

/// Point-in-time counters snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub messages_sent: u64,
    pub messages_queued: u64,
    pub replies_resolved: u64,
    pub partials_delivered: u64,
    pub untrusted_dropped: u64,
    pub malformed_dropped: u64,
    pub unknown_replies: u64,
    pub stale_replies: u64,
    pub relayed_to_parent: u64,
    pub relayed_to_children: u64,
    pub handler_invocations: u64,
    pub invalid_args_dropped: u64,
    pub unhandled_requests: u64,
    pub closed_window_drops: u64,
    pub transport_errors: u64,
}

impl StatsSnapshot {
    pub fn total_dropped(&self) -> u64 {
        self.untrusted_dropped
            + self.malformed_dropped
            + self.unknown_replies
            + self.stale_replies
            + self.invalid_args_dropped
    }
}
