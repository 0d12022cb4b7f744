//! Caller-side completion handles.
//!
//! `ReplyStream` yields zero or more `Reply::Partial` items followed by exactly
//! one `Reply::Final`, then ends. `PendingReply` is the same stream awaited
//! for its final args only.

use crate::domain::correlation::MessageId;
use crate::domain::envelope::Reply;
use crate::error::BridgeError;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::sync::mpsc;

/// Stream of replies for one outbound call.
#[derive(Debug)]
pub struct ReplyStream {
    id: Option<MessageId>,
    rx: mpsc::UnboundedReceiver<Reply>,
    failure: Option<BridgeError>,
    finished: bool,
}

impl ReplyStream {
    pub(crate) fn new(id: MessageId, rx: mpsc::UnboundedReceiver<Reply>) -> Self {
        Self {
            id: Some(id),
            rx,
            failure: None,
            finished: false,
        }
    }

    /// A stream that yields `error` once and ends.
    pub(crate) fn failed(error: BridgeError) -> Self {
        let (_, rx) = mpsc::unbounded_channel();
        Self {
            id: None,
            rx,
            failure: Some(error),
            finished: false,
        }
    }

    /// Correlation id of the call, if it was issued.
    pub fn id(&self) -> Option<MessageId> {
        self.id
    }

    /// Skip partials and wait for the final args.
    pub async fn final_args(mut self) -> Result<Vec<Value>, BridgeError> {
        while let Some(item) = self.next().await {
            if let Reply::Final(args) = item? {
                return Ok(args);
            }
        }
        Err(BridgeError::SessionClosed)
    }

    /// Collect partial payloads and the final payload.
    pub async fn collect_all(mut self) -> Result<(Vec<Vec<Value>>, Vec<Value>), BridgeError> {
        let mut partials = Vec::new();
        while let Some(item) = self.next().await {
            match item? {
                Reply::Partial(args) => partials.push(args),
                Reply::Final(args) => return Ok((partials, args)),
            }
        }
        Err(BridgeError::SessionClosed)
    }
}

impl Stream for ReplyStream {
    type Item = Result<Reply, BridgeError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        if let Some(error) = self.failure.take() {
            self.finished = true;
            return Poll::Ready(Some(Err(error)));
        }
        match ready!(self.rx.poll_recv(cx)) {
            Some(reply) => {
                if !reply.is_partial() {
                    self.finished = true;
                }
                Poll::Ready(Some(Ok(reply)))
            }
            None => {
                // Entry dropped without a final reply: teardown or an
                // abandoned pre-handshake call.
                self.finished = true;
                Poll::Ready(Some(Err(BridgeError::SessionClosed)))
            }
        }
    }
}

/// Future resolving to the final args of one call.
#[derive(Debug)]
pub struct PendingReply {
    stream: ReplyStream,
}

impl PendingReply {
    pub fn id(&self) -> Option<MessageId> {
        self.stream.id()
    }
}

impl From<ReplyStream> for PendingReply {
    fn from(stream: ReplyStream) -> Self {
        Self { stream }
    }
}

impl Future for PendingReply {
    type Output = Result<Vec<Value>, BridgeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        loop {
            match ready!(self.stream.poll_next_unpin(cx)) {
                Some(Ok(Reply::Final(args))) => return Poll::Ready(Ok(args)),
                Some(Ok(Reply::Partial(_))) => continue,
                Some(Err(error)) => return Poll::Ready(Err(error)),
                None => return Poll::Ready(Err(BridgeError::SessionClosed)),
            }
        }
    }
}
