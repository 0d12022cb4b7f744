//! Domain layer - pure correlation, trust and relay logic, no I/O.

pub mod children;
pub mod config;
pub mod correlation;
pub mod envelope;
pub mod handshake;
pub mod origin;
pub mod queue;
pub mod types;

pub use children::{ChildRecord, ChildRegistry};
pub use config::{BridgeConfig, ConfigError, OriginConfig, QueueConfig, RelayConfig};
pub use correlation::{
    Completion, CorrelationTable, DispatchOutcome, DuplicateIdError, IdAllocator, MessageId,
};
pub use envelope::{Envelope, MessageRequest, MessageResponse, Reply};
pub use handshake::{Handshake, HandshakeState, HostInfo, InitHandle};
pub use origin::OriginValidator;
pub use queue::{Outbound, OutboundMessage, OutboundQueue, QueueFull};
pub use types::{frame_contexts, Endpoint, ParentLink, WindowId};
