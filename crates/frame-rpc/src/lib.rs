//! # frame-rpc
//!
//! Message correlation, origin trust and parent/child relaying for code
//! running inside an embedded frame that talks to its host over an
//! asynchronous, unordered message channel.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        SESSION (one per frame)                    │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  capability call ──▶ handshake gate ──▶ outbound queue ──▶ codec │
//! │                                                         │        │
//! │                                                    Transport ────┼──▶ parent / children
//! │                                                         │        │
//! │  reply stream ◀── correlation table ◀── codec ◀── origin check ◀─┼─── on_message
//! │                          │                                       │
//! │                 child relay registry                             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure logic, no I/O
//!   - `OriginValidator`: exact-match https allow-list
//!   - `CorrelationTable`: id → pending completion, exactly one final
//!   - `OutboundQueue`: FIFO of pre-handshake traffic
//!   - `Handshake`: `Uninitialized → Pending → Initialized | Failed`
//!   - `ChildRegistry`: known child windows and their origins
//!
//! - **Ports Layer** (`ports/`): the `Transport` trait
//!
//! - **Handler Layer** (`handlers/`): name → typed handler registry
//!
//! - **Service Layer** (`service/`): `Session`, reply streams, statistics
//!
//! - **Adapters Layer** (`adapters/`): in-memory and channel transports
//!
//! - **Capabilities** (`capabilities/`): typed host calls built on `Session`
//!
//! ## Security
//!
//! - Every inbound frame is checked against the trusted origin set before it
//!   is decoded; untrusted frames have no effect besides a counter and a log
//!   line.
//! - Only `https` origins are ever trusted.
//! - Nothing but the `initialize` call reaches the transport until the
//!   handshake completes.
//!
//! ## Usage
//!
//! ```ignore
//! use frame_rpc::{BridgeConfig, ParentLink, Session, WindowId};
//!
//! let session = Session::new(BridgeConfig::default(), ParentLink::Framed(WindowId(0)), transport)?;
//! let init = session.initialize(Some(vec!["https://www.example.com".into()]));
//! let context = session.send_request("getContext", vec![]);
//! // ... feed inbound frames into session.on_message(source, origin, &raw)
//! let kind = init.await?;
//! let args = context.await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod capabilities;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod ports;
pub mod service;

/// Library version announced in the `initialize` call.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-exports
pub use adapters::{ChannelTransport, Delivery, InMemoryTransport, SentMessage};
pub use domain::{
    frame_contexts, BridgeConfig, ConfigError, Endpoint, HandshakeState, HostInfo, InitHandle,
    MessageId, MessageRequest, MessageResponse, OriginValidator, ParentLink, Reply, WindowId,
};
pub use error::{BridgeError, CodecError, HandlerError, TransportError};
pub use handlers::{HandlerRegistry, Responder};
pub use ports::Transport;
pub use service::{
    Disposition, DropReason, PendingReply, ReplyStream, Session, StatsSnapshot, THEME_CHANGE,
};
