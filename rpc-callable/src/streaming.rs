//! Client-streaming plumbing.
//!
//! A client-streaming call is driven from two ends:
//!
//! - the caller pushes request messages into a [`RequestSink`] and completes
//!   it when done;
//! - the response arrives on a [`StreamObserver`] the caller supplied when
//!   starting the call.
//!
//! The observer sees exactly one of `on_next` followed by `on_completed`, or
//! a single `on_error`.
//!
//! # Cancellation
//!
//! Dropping a [`RequestSink`] before calling [`complete`](RequestSink::complete)
//! cancels the call, the same as calling [`cancel`](RequestSink::cancel).

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use futures::{Stream, StreamExt};

use crate::error::SinkError;
use crate::future::Cancelled;

/// Receives the outcome of a streaming call.
pub trait StreamObserver<T, E>: Send {
    /// Called for each response message.
    fn on_next(&mut self, value: T);

    /// Called once if the call fails. No other method is called afterwards.
    fn on_error(&mut self, error: E);

    /// Called once if the call succeeds. No other method is called afterwards.
    fn on_completed(&mut self);
}

/// A boxed [`StreamObserver`].
pub type BoxObserver<T, E> = Box<dyn StreamObserver<T, E>>;

/// A single observer signal, as produced by [`observer_channel`].
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent<T, E> {
    Next(T),
    Error(E),
    Completed,
}

impl<T, E> StreamEvent<T, E> {
    /// Returns the message carried by a `Next` event.
    pub fn into_next(self) -> Option<T> {
        match self {
            StreamEvent::Next(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the error carried by an `Error` event.
    pub fn into_error(self) -> Option<E> {
        match self {
            StreamEvent::Error(error) => Some(error),
            _ => None,
        }
    }
}

struct ChannelObserver<T, E> {
    tx: UnboundedSender<StreamEvent<T, E>>,
}

impl<T: Send, E: Send> StreamObserver<T, E> for ChannelObserver<T, E> {
    fn on_next(&mut self, value: T) {
        let _ = self.tx.unbounded_send(StreamEvent::Next(value));
    }

    fn on_error(&mut self, error: E) {
        let _ = self.tx.unbounded_send(StreamEvent::Error(error));
        self.tx.close_channel();
    }

    fn on_completed(&mut self) {
        let _ = self.tx.unbounded_send(StreamEvent::Completed);
        self.tx.close_channel();
    }
}

/// Create an observer that forwards every signal into a stream.
///
/// The stream ends after the first terminal event, or when the observer is
/// dropped.
///
/// ```ignore
/// let (observer, mut events) = observer_channel::<Summary, ApiError>();
/// let mut sink = callable.client_streaming_call(observer, &context)?;
/// sink.send(point)?;
/// sink.complete()?;
///
/// while let Some(event) = events.next().await {
///     println!("{:?}", event);
/// }
/// ```
pub fn observer_channel<T, E>() -> (BoxObserver<T, E>, UnboundedReceiver<StreamEvent<T, E>>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    let (tx, rx) = unbounded();
    (Box::new(ChannelObserver { tx }), rx)
}

enum SinkMessage<T> {
    Item(T),
    Cancel,
}

/// Create a connected request sink and request stream.
///
/// Messages pushed into the sink come out of the stream in push order.
pub fn request_channel<T>() -> (RequestSink<T>, RequestStream<T>) {
    let (tx, rx) = unbounded();
    (
        RequestSink { tx: Some(tx) },
        RequestStream {
            rx,
            cancelled: false,
        },
    )
}

/// The caller's end of a client-streaming call.
pub struct RequestSink<T> {
    tx: Option<UnboundedSender<SinkMessage<T>>>,
}

impl<T> RequestSink<T> {
    /// Push one request message.
    ///
    /// Fails with [`SinkError::Closed`] after [`complete`](Self::complete) or
    /// [`cancel`](Self::cancel), and with [`SinkError::Disconnected`] once the
    /// call has ended and no longer reads requests.
    pub fn send(&mut self, message: T) -> Result<(), SinkError> {
        let tx = self.tx.as_ref().ok_or(SinkError::Closed)?;
        tx.unbounded_send(SinkMessage::Item(message))
            .map_err(|_| SinkError::Disconnected)
    }

    /// Signal that no more requests follow.
    pub fn complete(&mut self) -> Result<(), SinkError> {
        self.tx.take().map(drop).ok_or(SinkError::Closed)
    }

    /// Abort the call. The response observer receives a cancellation error.
    pub fn cancel(&mut self) -> Result<(), SinkError> {
        let tx = self.tx.take().ok_or(SinkError::Closed)?;
        // the call may already be over, which leaves nothing to cancel
        let _ = tx.unbounded_send(SinkMessage::Cancel);
        Ok(())
    }

    /// Returns whether the sink still accepts messages from the caller.
    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().is_none_or(|tx| tx.is_closed())
    }
}

impl<T> Drop for RequestSink<T> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.unbounded_send(SinkMessage::Cancel);
        }
    }
}

impl<T> fmt::Debug for RequestSink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSink")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// The transport's end of a client-streaming call.
///
/// Yields `Ok` for each pushed message, and a single `Err(Cancelled)` if the
/// caller cancelled. The stream ends when the caller completes the sink.
pub struct RequestStream<T> {
    rx: UnboundedReceiver<SinkMessage<T>>,
    cancelled: bool,
}

impl<T> Stream for RequestStream<T> {
    type Item = Result<T, Cancelled>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.cancelled {
            return Poll::Ready(None);
        }
        match self.rx.poll_next_unpin(cx) {
            Poll::Ready(Some(SinkMessage::Item(message))) => Poll::Ready(Some(Ok(message))),
            Poll::Ready(Some(SinkMessage::Cancel)) => {
                self.cancelled = true;
                self.rx.close();
                Poll::Ready(Some(Err(Cancelled)))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> fmt::Debug for RequestStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestStream")
            .field("cancelled", &self.cancelled)
            .finish()
    }
}
