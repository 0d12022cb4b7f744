//! Adapters Layer
//!
//! Implementations of the `Transport` port:
//! - `InMemoryTransport` records every send, for tests and tooling.
//! - `ChannelTransport` posts onto a tokio channel so several sessions can be
//!   wired together in one process.

pub mod channel;
pub mod memory;

pub use channel::{ChannelTransport, Delivery};
pub use memory::{InMemoryTransport, SentMessage};
