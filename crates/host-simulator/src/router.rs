//! Delivery loop between the host and the attached frames.

use crate::host::Host;
use frame_rpc::adapters::channel::ClosedWindows;
use frame_rpc::{Delivery, Endpoint, Session, WindowId};
use frame_telemetry::{log_event, log_frame_event};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

struct Frame {
    origin: String,
    session: Arc<Session>,
}

/// Owns the receive side of the delivery channel and hands every delivery to
/// its target.
pub struct Router {
    host: Host,
    frames: HashMap<WindowId, Frame>,
    tx: mpsc::UnboundedSender<Delivery>,
    closed: ClosedWindows,
}

impl Router {
    pub fn new(host: Host, tx: mpsc::UnboundedSender<Delivery>, closed: ClosedWindows) -> Self {
        Self {
            host,
            frames: HashMap::new(),
            tx,
            closed,
        }
    }

    /// Attach a frame served from `origin` at `window`.
    pub fn attach(&mut self, window: WindowId, origin: impl Into<String>, session: Arc<Session>) {
        self.frames.insert(
            window,
            Frame {
                origin: origin.into(),
                session,
            },
        );
    }

    /// Route deliveries until `shutdown` flips.
    pub async fn run(
        self,
        mut rx: mpsc::UnboundedReceiver<Delivery>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(frames = self.frames.len(), "Router started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Router shutting down");
                    break;
                }
                delivery = rx.recv() => match delivery {
                    Some(delivery) => self.route(delivery),
                    None => break,
                },
            }
        }
    }

    /// Deliver one message.
    pub fn route(&self, delivery: Delivery) {
        log_frame_event!(debug, "router", "Routing message", delivery.from, delivery.to);

        let receiver_origin = match delivery.to {
            Endpoint::Host => self.host.origin(),
            Endpoint::Window(window) => match self.frames.get(&window) {
                Some(frame) => frame.origin.as_str(),
                None => {
                    warn!(to = %delivery.to, "No frame attached at target window");
                    return;
                }
            },
        };
        if let Some(target_origin) = delivery.target_origin.as_deref() {
            if target_origin != receiver_origin {
                log_event!(
                    warn,
                    "router",
                    "Target origin mismatch, message not delivered",
                    to = %delivery.to,
                    expected = target_origin,
                    actual = receiver_origin
                );
                return;
            }
        }

        match delivery.to {
            Endpoint::Host => {
                for reply in self.host.handle(&delivery) {
                    if self.tx.send(reply).is_err() {
                        warn!("Delivery channel closed, dropping host reply");
                    }
                }
            }
            Endpoint::Window(window) => {
                if self.closed.read().contains(&window) {
                    debug!(%window, "Target window closed");
                    return;
                }
                let Some(frame) = self.frames.get(&window) else {
                    return;
                };
                match frame
                    .session
                    .on_message(delivery.from, &delivery.origin, &delivery.envelope)
                {
                    Ok(disposition) if disposition.is_dropped() => {
                        log_event!(info, "router", "Frame dropped message", %window, disposition = ?disposition);
                    }
                    Ok(disposition) => {
                        debug!(%window, disposition = ?disposition, "Frame handled message");
                    }
                    Err(e) => {
                        log_event!(warn, "router", "Frame failed to handle message", %window, error = %e);
                    }
                }
            }
        }
    }

    /// Close `window`; transports stop sending to it.
    pub fn close_window(&self, window: WindowId) {
        self.closed.write().insert(window);
    }
}
