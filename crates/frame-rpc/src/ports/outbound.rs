//! Outbound port to the cross-window messaging primitive.

use crate::domain::types::{Endpoint, WindowId};
use crate::error::TransportError;
use serde_json::Value;

/// Transport adapter (Driven Port)
///
/// Implementations post a structured value to a window or to the native host
/// channel. Delivery is fire-and-forget; replies come back through
/// `Session::on_message`.
///
/// The session calls `send` and `is_closed` while holding its state lock,
/// and that lock is not reentrant. An implementation must never call back
/// into the same session from inside these methods: deliver inbound traffic
/// from another task or after `send` returns, as `ChannelTransport` does.
pub trait Transport: Send + Sync {
    /// Post `envelope` to `target`. `target_origin` restricts delivery to a
    /// window currently showing that origin; `None` means any origin.
    fn send(
        &self,
        target: Endpoint,
        envelope: Value,
        target_origin: Option<&str>,
    ) -> Result<(), TransportError>;

    /// Whether `window` has been closed and can no longer receive.
    fn is_closed(&self, window: WindowId) -> bool;

    /// Release the inbound subscription. Called once on session teardown.
    fn detach(&self) {}
}
