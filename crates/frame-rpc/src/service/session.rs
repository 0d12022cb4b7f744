//! Frame RPC session - main entry point for one embedded frame.
//!
//! A `Session` owns the id counter, the correlation table, the outbound
//! queue, the trusted origin set and the child registry. Every inbound frame
//! enters through `on_message`; every outbound frame leaves through the
//! `Transport` port.
//!
//! Locking: session state sits behind one mutex that is held while writing
//! to the transport, so queued traffic drains in order. Handlers always run
//! with no lock held and may call back into the session.

use crate::domain::children::ChildRegistry;
use crate::domain::config::BridgeConfig;
use crate::domain::correlation::{
    Completion, CorrelationTable, DispatchOutcome, IdAllocator, MessageId,
};
use crate::domain::envelope::{
    decode, encode_request, encode_response, Envelope, MessageRequest, MessageResponse, Reply,
};
use crate::domain::handshake::{Handshake, HandshakeState, HostInfo, InitHandle};
use crate::domain::origin::OriginValidator;
use crate::domain::queue::{Outbound, OutboundMessage, OutboundQueue};
use crate::domain::types::{Endpoint, ParentLink, WindowId};
use crate::error::{BridgeError, HandlerError};
use crate::handlers::{HandlerFn, HandlerOutput, HandlerRegistry, Responder};
use crate::ports::Transport;
use crate::service::reply::{PendingReply, ReplyStream};
use crate::service::stats::{SessionStats, StatsSnapshot};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::iter;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Name of the handshake call.
pub const INITIALIZE: &str = "initialize";

/// Built-in notification relayed from the host down to every child.
pub const THEME_CHANGE: &str = "themeChange";

/// Why an inbound message was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    SessionClosed,
    UntrustedOrigin,
    Malformed,
    /// The host channel spoke to a framed session.
    UnknownSource,
    /// A child sent a response; children are never called by this session.
    UnexpectedResponse,
    /// No call with this id was ever issued.
    UnknownId,
    /// The call already resolved.
    StaleReply,
    NoHandler,
    InvalidArguments,
    /// Could not be sent on or queued.
    Undeliverable,
}

/// What `on_message` did with one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Initialized { frame_context: String },
    HandshakeFailed { reason: String },
    /// Final reply delivered to a local caller.
    Resolved { id: MessageId },
    /// Partial reply delivered to a local caller.
    Streamed { id: MessageId },
    /// Ran a local handler. `replied` is set when a response went back.
    Handled { func: String, replied: bool },
    RelayedToParent { func: String },
    RelayedToChild { window: WindowId },
    RelayedToChildren { func: String, count: usize },
    Dropped(DropReason),
}

impl Disposition {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Disposition::Dropped(_))
    }
}

type ThemeHandler = Arc<dyn Fn(&str) + Send + Sync>;

struct SessionState {
    ids: IdAllocator,
    table: CorrelationTable,
    queue: OutboundQueue,
    children: ChildRegistry,
    origins: OriginValidator,
    /// Learned from the first trusted parent message.
    parent_origin: Option<String>,
    closed: bool,
}

/// One frame's RPC session.
pub struct Session {
    id: Uuid,
    config: BridgeConfig,
    parent: ParentLink,
    transport: Arc<dyn Transport>,
    handshake: Handshake,
    state: Mutex<SessionState>,
    handlers: RwLock<HandlerRegistry>,
    /// Consulted before `handlers` for requests coming from children.
    child_handlers: RwLock<HandlerRegistry>,
    theme_handler: RwLock<Option<ThemeHandler>>,
    stats: SessionStats,
}

impl Session {
    /// Create a session talking to `parent` through `transport`.
    pub fn new(
        config: BridgeConfig,
        parent: ParentLink,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, BridgeError> {
        config.validate()?;

        let id = Uuid::new_v4();
        let state = SessionState {
            ids: IdAllocator::new(config.id_base),
            table: CorrelationTable::new(),
            queue: OutboundQueue::new(config.queue.max_pending_messages),
            children: ChildRegistry::new(),
            origins: OriginValidator::with_extra(
                config.origins.allow_pre_production,
                &config.origins.additional,
            ),
            parent_origin: None,
            closed: false,
        };

        info!(session = %id, parent = %parent.endpoint(), "Created frame RPC session");

        Ok(Self {
            id,
            config,
            parent,
            transport,
            handshake: Handshake::new(),
            state: Mutex::new(state),
            handlers: RwLock::new(HandlerRegistry::new()),
            child_handlers: RwLock::new(HandlerRegistry::new()),
            theme_handler: RwLock::new(None),
            stats: SessionStats::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn parent(&self) -> ParentLink {
        self.parent
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    // =========================================================================
    // Handshake
    // =========================================================================

    /// Start the handshake, trusting `valid_origins` in addition to the
    /// built-in and configured origins.
    ///
    /// Only the first call sends anything. Later calls return a handle to the
    /// same outcome.
    pub fn initialize(&self, valid_origins: Option<Vec<String>>) -> InitHandle {
        let handle = self.handshake.subscribe();
        let mut state = self.state.lock();

        if state.closed {
            warn!(session = %self.id, "initialize called on a closed session");
            return handle;
        }
        if !self.handshake.is_uninitialized() {
            debug!(
                session = %self.id,
                state = self.handshake.state().name(),
                "Handshake already started"
            );
            return handle;
        }

        let extra = self
            .config
            .origins
            .additional
            .iter()
            .chain(valid_origins.iter().flatten());
        state.origins = OriginValidator::with_extra(self.config.origins.allow_pre_production, extra);

        let id = state.ids.next_id();
        if let Err(e) = state.table.register(id, INITIALIZE, Completion::Handshake) {
            self.handshake.fail(e.to_string());
            return handle;
        }
        self.handshake.begin(id);

        info!(
            session = %self.id,
            id = %id,
            trusted_origins = state.origins.len(),
            "Sending initialize"
        );
        let request = MessageRequest::call(id, INITIALIZE, vec![Value::from(crate::VERSION)]);
        let outbound = Outbound {
            target: self.parent.endpoint(),
            message: OutboundMessage::Request(request),
        };
        if let Err(e) = self.transmit(&mut state, outbound) {
            warn!(session = %self.id, error = %e, "Initialize was not sent");
        }
        handle
    }

    pub fn state(&self) -> HandshakeState {
        self.handshake.state()
    }

    pub fn host_info(&self) -> Option<HostInfo> {
        self.handshake.host_info()
    }

    /// Negotiated context kind, once initialized.
    pub fn context_kind(&self) -> Option<String> {
        self.handshake.host_info().map(|info| info.frame_context)
    }

    /// Fail unless the negotiated context kind is one of `allowed`.
    ///
    /// Before the handshake settles the kind is unknown and every call passes;
    /// the call is queued like any other.
    pub fn ensure_frame_context(&self, func: &str, allowed: &[&str]) -> Result<(), BridgeError> {
        match self.context_kind() {
            Some(current) if !allowed.contains(&current.as_str()) => {
                Err(BridgeError::WrongFrameContext {
                    func: func.to_string(),
                    current,
                })
            }
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Outbound calls
    // =========================================================================

    /// Call `func` on the parent and wait for its final reply.
    pub fn send_request(&self, func: &str, args: Vec<Value>) -> PendingReply {
        self.send_request_with_partials(func, args).into()
    }

    /// Call `func` on the parent and observe every partial reply before the
    /// final one.
    pub fn send_request_with_partials(&self, func: &str, args: Vec<Value>) -> ReplyStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        if state.closed {
            return ReplyStream::failed(BridgeError::SessionClosed);
        }

        let id = state.ids.next_id();
        if let Err(e) = state.table.register(id, func, Completion::Local(tx)) {
            return ReplyStream::failed(BridgeError::DuplicateId(e.0));
        }

        let outbound = Outbound {
            target: self.parent.endpoint(),
            message: OutboundMessage::Request(MessageRequest::call(id, func, args)),
        };
        if let Err(e) = self.dispatch_outbound(&mut state, outbound) {
            state.table.cancel(id);
            return ReplyStream::failed(e);
        }

        debug!(session = %self.id, id = %id, func = %func, "Issued call");
        ReplyStream::new(id, rx)
    }

    /// Send an arbitrary named message to the parent.
    pub fn send_custom_message(&self, name: &str, args: Vec<Value>) -> PendingReply {
        self.send_request(name, args)
    }

    /// Send a fire-and-forget event to the parent.
    pub fn send_event_to_parent(&self, func: &str, args: Vec<Value>) -> Result<(), BridgeError> {
        let mut state = self.state.lock();
        let outbound = Outbound {
            target: self.parent.endpoint(),
            message: OutboundMessage::Request(MessageRequest::event(func, args)),
        };
        self.dispatch_outbound(&mut state, outbound)
    }

    /// Broadcast a fire-and-forget event to every known child. Returns how
    /// many children it was sent or queued for.
    pub fn send_custom_event(&self, name: &str, args: Vec<Value>) -> usize {
        self.broadcast(name, args)
    }

    // =========================================================================
    // Handler registration
    // =========================================================================

    /// Register a typed handler for requests from the parent or children.
    /// Replaces any handler with the same name.
    pub fn register_handler<A, R, F>(&self, name: impl Into<String>, handler: F)
    where
        A: DeserializeOwned + 'static,
        R: Serialize + 'static,
        F: Fn(A) -> Result<R, HandlerError> + Send + Sync + 'static,
    {
        self.handlers.write().register(name, handler);
    }

    pub fn register_streaming_handler<A, R, F>(&self, name: impl Into<String>, handler: F)
    where
        A: DeserializeOwned + 'static,
        R: Serialize + 'static,
        F: Fn(A, &mut Responder) -> Result<R, HandlerError> + Send + Sync + 'static,
    {
        self.handlers.write().register_streaming(name, handler);
    }

    pub fn register_raw_handler<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(Vec<Value>) -> Result<Option<Vec<Value>>, HandlerError> + Send + Sync + 'static,
    {
        self.handlers.write().register_raw(name, handler);
    }

    /// Register a handler consulted only for requests coming from children.
    pub fn register_handler_for_child<A, R, F>(&self, name: impl Into<String>, handler: F)
    where
        A: DeserializeOwned + 'static,
        R: Serialize + 'static,
        F: Fn(A) -> Result<R, HandlerError> + Send + Sync + 'static,
    {
        self.child_handlers.write().register(name, handler);
    }

    pub fn remove_handler(&self, name: &str) -> bool {
        let parent_side = self.handlers.write().remove(name);
        let child_side = self.child_handlers.write().remove(name);
        parent_side || child_side
    }

    /// Observe theme changes pushed by the host.
    pub fn on_theme_change<F>(&self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *self.theme_handler.write() = Some(Arc::new(handler));
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Process one inbound frame from `source` claiming `origin`.
    ///
    /// Trust and decode failures are dropped and reported through the
    /// returned `Disposition`. Only a failing local handler is an error.
    pub fn on_message(
        &self,
        source: Endpoint,
        origin: &str,
        raw: &Value,
    ) -> Result<Disposition, BridgeError> {
        {
            let state = self.state.lock();
            if state.closed {
                return Ok(Disposition::Dropped(DropReason::SessionClosed));
            }
            if !state.origins.is_trusted(origin) {
                SessionStats::incr(&self.stats.untrusted_dropped);
                warn!(
                    session = %self.id,
                    source = %source,
                    origin = %origin,
                    "Dropped message from untrusted origin"
                );
                return Ok(Disposition::Dropped(DropReason::UntrustedOrigin));
            }
        }

        let envelope = match decode(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                SessionStats::incr(&self.stats.malformed_dropped);
                debug!(session = %self.id, source = %source, error = %e, "Dropped malformed message");
                return Ok(Disposition::Dropped(DropReason::Malformed));
            }
        };

        if self.parent.is_parent(source) {
            self.learn_parent_origin(origin);
            return match envelope {
                Envelope::Response(response) => Ok(self.handle_parent_response(response)),
                Envelope::Request(request) => self.handle_parent_request(request),
            };
        }

        let Endpoint::Window(window) = source else {
            debug!(session = %self.id, "Dropped host message in a framed session");
            return Ok(Disposition::Dropped(DropReason::UnknownSource));
        };

        match envelope {
            Envelope::Request(request) => self.handle_child_request(window, origin, request),
            Envelope::Response(response) => {
                debug!(session = %self.id, window = %window, id = %response.id, "Dropped response from child");
                Ok(Disposition::Dropped(DropReason::UnexpectedResponse))
            }
        }
    }

    fn learn_parent_origin(&self, origin: &str) {
        let mut state = self.state.lock();
        if state.parent_origin.is_none() {
            debug!(session = %self.id, origin = %origin, "Learned parent origin");
            state.parent_origin = Some(origin.to_string());
        }
    }

    fn handle_parent_response(&self, response: MessageResponse) -> Disposition {
        let id = response.id;
        let mut state = self.state.lock();

        match state.table.dispatch(id, response.into_reply()) {
            DispatchOutcome::Delivered { func, last } => {
                if last {
                    SessionStats::incr(&self.stats.replies_resolved);
                    debug!(session = %self.id, id = %id, func = %func, "Resolved call");
                    Disposition::Resolved { id }
                } else {
                    SessionStats::incr(&self.stats.partials_delivered);
                    Disposition::Streamed { id }
                }
            }
            DispatchOutcome::Relay {
                func,
                child,
                child_id,
                reply,
            } => {
                let outbound = Outbound {
                    target: Endpoint::Window(child),
                    message: OutboundMessage::Response(MessageResponse::from_reply(child_id, reply)),
                };
                if let Err(e) = self.dispatch_outbound(&mut state, outbound) {
                    debug!(session = %self.id, window = %child, error = %e, "Could not relay reply");
                    return Disposition::Dropped(DropReason::Undeliverable);
                }
                SessionStats::incr(&self.stats.relayed_to_children);
                debug!(
                    session = %self.id,
                    id = %id,
                    child_id = %child_id,
                    window = %child,
                    func = %func,
                    "Relayed reply to child"
                );
                Disposition::RelayedToChild { window: child }
            }
            DispatchOutcome::Handshake { reply } => self.settle_handshake(&mut state, id, reply),
            DispatchOutcome::Unknown => {
                if state.ids.has_issued(id) {
                    SessionStats::incr(&self.stats.stale_replies);
                    debug!(session = %self.id, id = %id, "Dropped reply for resolved call");
                    Disposition::Dropped(DropReason::StaleReply)
                } else {
                    SessionStats::incr(&self.stats.unknown_replies);
                    debug!(session = %self.id, id = %id, "Dropped reply with unknown id");
                    Disposition::Dropped(DropReason::UnknownId)
                }
            }
        }
    }

    fn settle_handshake(&self, state: &mut SessionState, id: MessageId, reply: Reply) -> Disposition {
        let Reply::Final(args) = reply else {
            debug!(session = %self.id, "Ignored partial reply to initialize");
            return Disposition::Streamed { id };
        };

        match self.handshake.complete(&args) {
            Ok(info) => {
                let queued = state.queue.drain();
                info!(
                    session = %self.id,
                    frame_context = %info.frame_context,
                    queued = queued.len(),
                    "Handshake complete"
                );
                for outbound in queued {
                    let id = outbound.message.call_id();
                    if self.transmit(state, outbound).is_err() {
                        // A call that never left cannot be answered.
                        if let Some(id) = id {
                            state.table.cancel(id);
                        }
                    }
                }
                Disposition::Initialized {
                    frame_context: info.frame_context,
                }
            }
            Err(reason) => {
                // Queued calls are abandoned; their handles observe a closed
                // stream.
                let abandoned = state.queue.drain();
                for id in abandoned.iter().filter_map(|o| o.message.call_id()) {
                    state.table.cancel(id);
                }
                warn!(
                    session = %self.id,
                    reason = %reason,
                    abandoned = abandoned.len(),
                    "Handshake failed"
                );
                Disposition::HandshakeFailed { reason }
            }
        }
    }

    fn handle_parent_request(&self, request: MessageRequest) -> Result<Disposition, BridgeError> {
        let MessageRequest { id, func, args } = request;

        let handler = self.handlers.read().get(&func);
        if let Some(handler) = handler {
            let Some(output) = self.invoke(&func, &handler, args)? else {
                return Ok(Disposition::Dropped(DropReason::InvalidArguments));
            };
            let replied = match id {
                Some(id) => self.respond(self.parent.endpoint(), id, output),
                None => false,
            };
            return Ok(Disposition::Handled { func, replied });
        }

        if func == THEME_CHANGE {
            self.handle_theme_change(args);
            return Ok(Disposition::Handled {
                func,
                replied: false,
            });
        }

        if self.config.relay.forward_unhandled_to_children {
            let count = self.broadcast(&func, args);
            if count > 0 {
                SessionStats::add(&self.stats.relayed_to_children, count as u64);
                debug!(session = %self.id, func = %func, count, "Relayed parent request to children");
                return Ok(Disposition::RelayedToChildren { func, count });
            }
        }

        SessionStats::incr(&self.stats.unhandled_requests);
        debug!(session = %self.id, func = %func, "No handler for parent request");
        Ok(Disposition::Dropped(DropReason::NoHandler))
    }

    fn handle_child_request(
        &self,
        window: WindowId,
        origin: &str,
        request: MessageRequest,
    ) -> Result<Disposition, BridgeError> {
        if self.state.lock().children.observe(window, origin) {
            info!(session = %self.id, window = %window, origin = %origin, "New child window");
        }

        let MessageRequest { id, func, args } = request;
        let handler = self
            .child_handlers
            .read()
            .get(&func)
            .or_else(|| self.handlers.read().get(&func));

        let handled = if let Some(handler) = handler {
            let Some(output) = self.invoke(&func, &handler, args.clone())? else {
                return Ok(Disposition::Dropped(DropReason::InvalidArguments));
            };
            if output.result.is_some() {
                let replied = match id {
                    Some(id) => self.respond(Endpoint::Window(window), id, output),
                    None => false,
                };
                return Ok(Disposition::Handled { func, replied });
            }
            true
        } else if func == THEME_CHANGE {
            self.handle_theme_change(args.clone());
            true
        } else {
            false
        };

        // Nothing answered locally: let the parent try.
        if self.config.relay.forward_unhandled_to_parent {
            return Ok(self.forward_to_parent(window, id, func, args));
        }

        if handled {
            Ok(Disposition::Handled {
                func,
                replied: false,
            })
        } else {
            SessionStats::incr(&self.stats.unhandled_requests);
            debug!(session = %self.id, window = %window, func = %func, "No handler for child request");
            Ok(Disposition::Dropped(DropReason::NoHandler))
        }
    }

    fn forward_to_parent(
        &self,
        window: WindowId,
        child_id: Option<MessageId>,
        func: String,
        args: Vec<Value>,
    ) -> Disposition {
        let mut state = self.state.lock();

        let request = match child_id {
            Some(child_id) => {
                let id = state.ids.next_id();
                let completion = Completion::Relay {
                    child: window,
                    child_id,
                };
                if let Err(e) = state.table.register(id, func.as_str(), completion) {
                    warn!(session = %self.id, error = %e, "Could not forward child request");
                    return Disposition::Dropped(DropReason::Undeliverable);
                }
                MessageRequest::call(id, func.as_str(), args)
            }
            None => MessageRequest::event(func.as_str(), args),
        };
        let forwarded_id = request.id;

        let outbound = Outbound {
            target: self.parent.endpoint(),
            message: OutboundMessage::Request(request),
        };
        if let Err(e) = self.dispatch_outbound(&mut state, outbound) {
            if let Some(id) = forwarded_id {
                state.table.cancel(id);
            }
            debug!(session = %self.id, func = %func, error = %e, "Could not forward child request");
            return Disposition::Dropped(DropReason::Undeliverable);
        }

        SessionStats::incr(&self.stats.relayed_to_parent);
        debug!(
            session = %self.id,
            window = %window,
            func = %func,
            "Forwarded child request to parent"
        );
        Disposition::RelayedToParent { func }
    }

    fn handle_theme_change(&self, args: Vec<Value>) -> usize {
        let theme = args
            .first()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let handler = self.theme_handler.read().clone();
        if let Some(handler) = handler {
            handler(&theme);
        }
        self.broadcast(THEME_CHANGE, args)
    }

    /// Run a handler with no lock held. `Ok(None)` means the args did not
    /// fit the handler's signature.
    fn invoke(
        &self,
        func: &str,
        handler: &HandlerFn,
        args: Vec<Value>,
    ) -> Result<Option<HandlerOutput>, BridgeError> {
        SessionStats::incr(&self.stats.handler_invocations);
        match handler.call(args) {
            Ok(output) => Ok(Some(output)),
            Err(HandlerError::InvalidArguments(reason)) => {
                SessionStats::incr(&self.stats.invalid_args_dropped);
                warn!(session = %self.id, func = %func, reason = %reason, "Dropped request with mismatched args");
                Ok(None)
            }
            Err(source) => Err(BridgeError::Handler {
                func: func.to_string(),
                source,
            }),
        }
    }

    /// Send a handler's partials and final result back under `id`. Returns
    /// false when the handler produced no value.
    fn respond(&self, target: Endpoint, id: MessageId, output: HandlerOutput) -> bool {
        let Some(result) = output.result else {
            return false;
        };
        let replies: Vec<_> = output
            .partials
            .into_iter()
            .map(Reply::Partial)
            .chain(iter::once(Reply::Final(result)))
            .collect();

        let mut state = self.state.lock();
        // Queue all of the response or none of it.
        if !self.handshake.is_open() && !state.queue.has_room(replies.len()) {
            debug!(
                session = %self.id,
                id = %id,
                target = %target,
                replies = replies.len(),
                "No queue room for response"
            );
            return false;
        }
        for reply in replies {
            let outbound = Outbound {
                target,
                message: OutboundMessage::Response(MessageResponse::from_reply(id, reply)),
            };
            if let Err(e) = self.dispatch_outbound(&mut state, outbound) {
                debug!(session = %self.id, id = %id, target = %target, error = %e, "Could not send response");
                return false;
            }
        }
        true
    }

    fn broadcast(&self, func: &str, args: Vec<Value>) -> usize {
        let mut state = self.state.lock();
        let mut sent = 0;
        for (window, _) in state.children.targets() {
            if self.transport.is_closed(window) {
                state.children.prune(window);
                SessionStats::incr(&self.stats.closed_window_drops);
                continue;
            }
            let outbound = Outbound {
                target: Endpoint::Window(window),
                message: OutboundMessage::Request(MessageRequest::event(func, args.clone())),
            };
            match self.dispatch_outbound(&mut state, outbound) {
                Ok(()) => sent += 1,
                Err(e) => {
                    debug!(session = %self.id, window = %window, func = %func, error = %e, "Could not send event");
                }
            }
        }
        sent
    }

    // =========================================================================
    // Wire
    // =========================================================================

    /// Send now if the handshake is done, queue if it is still pending.
    /// `Ok` means the message left the frame or sits in the queue.
    fn dispatch_outbound(
        &self,
        state: &mut SessionState,
        outbound: Outbound,
    ) -> Result<(), BridgeError> {
        if state.closed {
            return Err(BridgeError::SessionClosed);
        }
        if self.handshake.is_open() {
            return self.transmit(state, outbound);
        }
        if let HandshakeState::Failed(reason) = self.handshake.state() {
            return Err(BridgeError::HandshakeFailed(reason));
        }

        debug!(
            session = %self.id,
            target = %outbound.target,
            func = %outbound.message.label(),
            "Queued until handshake completes"
        );
        state
            .queue
            .enqueue(outbound)
            .map_err(|full| BridgeError::QueueFull {
                capacity: full.capacity,
            })?;
        SessionStats::incr(&self.stats.messages_queued);
        Ok(())
    }

    /// Write one envelope to the transport, bypassing the handshake gate.
    /// Sends to a closed or unknown child are dropped and reported as errors.
    fn transmit(&self, state: &mut SessionState, outbound: Outbound) -> Result<(), BridgeError> {
        let Outbound { target, message } = outbound;

        let origin_hint = match target {
            Endpoint::Window(window) if !self.parent.is_parent(target) => {
                if self.transport.is_closed(window) {
                    state.children.prune(window);
                    SessionStats::incr(&self.stats.closed_window_drops);
                    debug!(session = %self.id, window = %window, "Dropped send to closed child");
                    return Err(BridgeError::WindowClosed(window));
                }
                match state.children.get(window) {
                    Some(child) => Some(child.origin.clone()),
                    None => {
                        debug!(session = %self.id, window = %window, "Dropped send to unknown child");
                        return Err(BridgeError::UnknownWindow(window));
                    }
                }
            }
            _ => state.parent_origin.clone(),
        };

        let encoded = match &message {
            OutboundMessage::Request(request) => encode_request(request),
            OutboundMessage::Response(response) => encode_response(response),
        };
        let envelope = encoded.map_err(|e| {
            warn!(session = %self.id, func = %message.label(), error = %e, "Failed to encode message");
            BridgeError::from(e)
        })?;

        match self.transport.send(target, envelope, origin_hint.as_deref()) {
            Ok(()) => {
                SessionStats::incr(&self.stats.messages_sent);
                Ok(())
            }
            Err(e) => {
                SessionStats::incr(&self.stats.transport_errors);
                warn!(
                    session = %self.id,
                    target = %target,
                    func = %message.label(),
                    error = %e,
                    "Transport send failed"
                );
                Err(e.into())
            }
        }
    }

    // =========================================================================
    // Introspection and teardown
    // =========================================================================

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().table.pending_count()
    }

    pub fn queued_count(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn child_count(&self) -> usize {
        self.state.lock().children.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Detach from the transport and abandon every pending call. Pending
    /// handles observe `SessionClosed`. Idempotent.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let abandoned = state.table.clear();
        let queued = state.queue.drain().len();
        state.children.clear();
        drop(state);

        if !matches!(
            self.handshake.state(),
            HandshakeState::Initialized(_) | HandshakeState::Failed(_)
        ) {
            self.handshake.fail("session shut down");
        }
        self.transport.detach();

        info!(session = %self.id, abandoned, queued, "Session shut down");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("state", &self.handshake.state().name())
            .finish_non_exhaustive()
    }
}
