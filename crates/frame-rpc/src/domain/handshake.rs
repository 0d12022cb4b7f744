//! Handshake state machine.
//!
//! ```text
//! Uninitialized ──begin()──▶ Pending ──complete()──▶ Initialized
//!                               │
//!                               └──────fail()──────▶ Failed
//! ```
//!
//! Every waiter shares one `watch` channel, so a second `initialize()` while
//! Pending observes the same outcome as the first without another wire
//! message.

use crate::domain::correlation::MessageId;
use crate::error::BridgeError;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::IntoFuture;
use tokio::sync::watch;

/// What the host told us in its reply to `initialize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    /// Negotiated context kind, e.g. `content` or `sidePanel`.
    pub frame_context: String,
    pub client_type: Option<String>,
    pub runtime_config: Option<Value>,
    pub host_version: Option<String>,
}

impl HostInfo {
    /// Parse `[frameContext, clientType?, runtimeConfig?, hostVersion?]`.
    pub fn from_reply_args(args: &[Value]) -> Result<Self, String> {
        let frame_context = match args.first() {
            Some(Value::String(kind)) if !kind.is_empty() => kind.clone(),
            Some(other) => return Err(format!("invalid frame context: {other}")),
            None => return Err("initialize reply carried no frame context".into()),
        };
        let client_type = args.get(1).and_then(Value::as_str).map(str::to_string);
        // The runtime config arrives either as a JSON object or as its string
        // serialization.
        let runtime_config = match args.get(2) {
            Some(Value::String(raw)) => serde_json::from_str(raw).ok(),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.clone()),
        };
        let host_version = args.get(3).and_then(Value::as_str).map(str::to_string);
        Ok(Self {
            frame_context,
            client_type,
            runtime_config,
            host_version,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeState {
    Uninitialized,
    Pending { id: MessageId },
    Initialized(HostInfo),
    Failed(String),
}

impl HandshakeState {
    pub fn name(&self) -> &'static str {
        match self {
            HandshakeState::Uninitialized => "uninitialized",
            HandshakeState::Pending { .. } => "pending",
            HandshakeState::Initialized(_) => "initialized",
            HandshakeState::Failed(_) => "failed",
        }
    }

    fn is_settled(&self) -> bool {
        matches!(
            self,
            HandshakeState::Initialized(_) | HandshakeState::Failed(_)
        )
    }
}

/// Owner side of the state machine.
pub struct Handshake {
    state: watch::Sender<HandshakeState>,
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

impl Handshake {
    pub fn new() -> Self {
        let (state, _) = watch::channel(HandshakeState::Uninitialized);
        Self { state }
    }

    pub fn state(&self) -> HandshakeState {
        self.state.borrow().clone()
    }

    /// Traffic other than the handshake itself may flow.
    pub fn is_open(&self) -> bool {
        matches!(*self.state.borrow(), HandshakeState::Initialized(_))
    }

    pub fn is_uninitialized(&self) -> bool {
        matches!(*self.state.borrow(), HandshakeState::Uninitialized)
    }

    pub fn pending_id(&self) -> Option<MessageId> {
        match *self.state.borrow() {
            HandshakeState::Pending { id } => Some(id),
            _ => None,
        }
    }

    pub fn host_info(&self) -> Option<HostInfo> {
        match &*self.state.borrow() {
            HandshakeState::Initialized(info) => Some(info.clone()),
            _ => None,
        }
    }

    /// Uninitialized → Pending. Returns false if already started.
    pub fn begin(&self, id: MessageId) -> bool {
        self.state.send_if_modified(|state| {
            if matches!(state, HandshakeState::Uninitialized) {
                *state = HandshakeState::Pending { id };
                true
            } else {
                false
            }
        })
    }

    /// Pending → Initialized, or Failed if the reply is unusable.
    pub fn complete(&self, args: &[Value]) -> Result<HostInfo, String> {
        let outcome = HostInfo::from_reply_args(args);
        let next = match &outcome {
            Ok(info) => HandshakeState::Initialized(info.clone()),
            Err(reason) => HandshakeState::Failed(reason.clone()),
        };
        self.state.send_replace(next);
        outcome
    }

    pub fn fail(&self, reason: impl Into<String>) {
        self.state.send_replace(HandshakeState::Failed(reason.into()));
    }

    /// Handle resolving once the handshake settles.
    pub fn subscribe(&self) -> InitHandle {
        InitHandle {
            rx: self.state.subscribe(),
        }
    }
}

/// Completion handle for `initialize()`, yielding the context kind.
pub struct InitHandle {
    rx: watch::Receiver<HandshakeState>,
}

impl InitHandle {
    /// Wait for the handshake and return the full host info.
    pub async fn host_info(mut self) -> Result<HostInfo, BridgeError> {
        let state = self
            .rx
            .wait_for(HandshakeState::is_settled)
            .await
            .map_err(|_| BridgeError::SessionClosed)?;
        match &*state {
            HandshakeState::Initialized(info) => Ok(info.clone()),
            HandshakeState::Failed(reason) => Err(BridgeError::HandshakeFailed(reason.clone())),
            _ => Err(BridgeError::SessionClosed),
        }
    }

    /// Wait for the handshake and return the negotiated context kind.
    pub async fn context_kind(self) -> Result<String, BridgeError> {
        self.host_info().await.map(|info| info.frame_context)
    }
}

impl IntoFuture for InitHandle {
    type Output = Result<String, BridgeError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.context_kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transitions() {
        let hs = Handshake::new();
        assert!(hs.is_uninitialized());
        assert!(hs.begin(MessageId(0)));
        assert!(!hs.begin(MessageId(1)));
        assert_eq!(hs.pending_id(), Some(MessageId(0)));
        assert!(!hs.is_open());

        let info = hs.complete(&[json!("content"), json!("web")]).unwrap();
        assert_eq!(info.frame_context, "content");
        assert_eq!(info.client_type.as_deref(), Some("web"));
        assert!(hs.is_open());
        assert_eq!(hs.state().name(), "initialized");
    }

    #[test]
    fn test_invalid_reply_fails() {
        let hs = Handshake::new();
        hs.begin(MessageId(0));
        assert!(hs.complete(&[json!(42)]).is_err());
        assert!(matches!(hs.state(), HandshakeState::Failed(_)));
        assert!(!hs.is_open());
    }

    #[test]
    fn test_runtime_config_accepts_string_form() {
        let info =
            HostInfo::from_reply_args(&[json!("sidePanel"), json!("desktop"), json!("{\"apiVersion\":2}")])
                .unwrap();
        assert_eq!(info.runtime_config, Some(json!({ "apiVersion": 2 })));
    }

    #[tokio::test]
    async fn test_all_waiters_see_the_same_outcome() {
        let hs = Handshake::new();
        hs.begin(MessageId(0));
        let first = hs.subscribe();
        let second = hs.subscribe();

        hs.complete(&[json!("sidePanel")]).unwrap();

        assert_eq!(first.await.unwrap(), "sidePanel");
        assert_eq!(second.await.unwrap(), "sidePanel");
        // Late subscribers resolve immediately.
        assert_eq!(hs.subscribe().await.unwrap(), "sidePanel");
    }

    #[tokio::test]
    async fn test_failure_reaches_waiters() {
        let hs = Handshake::new();
        hs.begin(MessageId(0));
        let waiter = hs.subscribe();
        hs.fail("host refused");
        assert!(matches!(waiter.await, Err(BridgeError::HandshakeFailed(_))));
    }

    #[tokio::test]
    async fn test_dropped_session_closes_waiters() {
        let hs = Handshake::new();
        let waiter = hs.subscribe();
        drop(hs);
        assert!(matches!(waiter.await, Err(BridgeError::SessionClosed)));
    }
}
