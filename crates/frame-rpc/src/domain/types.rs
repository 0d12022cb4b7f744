//! Addressing types shared by the domain and the transport port.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle for a window (frame) reachable through the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// Where a message comes from or goes to.
///
/// `Host` is the native channel a frameless context uses in place of a parent
/// window; framed contexts reach their parent through a `Window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Host,
    Window(WindowId),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Host => f.write_str("host"),
            Endpoint::Window(id) => id.fmt(f),
        }
    }
}

/// How this context reaches its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentLink {
    /// Embedded in a parent window.
    Framed(WindowId),
    /// No parent window; the host is reached over the native channel and every
    /// other inbound sender is a candidate child.
    Frameless,
}

impl ParentLink {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            ParentLink::Framed(window) => Endpoint::Window(*window),
            ParentLink::Frameless => Endpoint::Host,
        }
    }

    pub fn is_frameless(&self) -> bool {
        matches!(self, ParentLink::Frameless)
    }

    /// Whether a message from `source` came from the parent.
    pub fn is_parent(&self, source: Endpoint) -> bool {
        source == self.endpoint()
    }
}

/// Frame contexts the host may report during the handshake.
pub mod frame_contexts {
    pub const CONTENT: &str = "content";
    pub const SIDE_PANEL: &str = "sidePanel";
    pub const SETTINGS: &str = "settings";
    pub const REMOVE: &str = "remove";
    pub const TASK: &str = "task";
    pub const STAGE: &str = "stage";
    pub const MEETING_STAGE: &str = "meetingStage";
    pub const AUTHENTICATION: &str = "authentication";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_link_classification() {
        let framed = ParentLink::Framed(WindowId(1));
        assert!(framed.is_parent(Endpoint::Window(WindowId(1))));
        assert!(!framed.is_parent(Endpoint::Window(WindowId(2))));
        assert!(!framed.is_parent(Endpoint::Host));

        let frameless = ParentLink::Frameless;
        assert!(frameless.is_parent(Endpoint::Host));
        assert!(!frameless.is_parent(Endpoint::Window(WindowId(1))));
        assert!(frameless.is_frameless());
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(Endpoint::Host.to_string(), "host");
        assert_eq!(Endpoint::Window(WindowId(7)).to_string(), "window#7");
    }
}
