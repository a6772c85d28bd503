//! Cancellable single-outcome futures.
//!
//! [`UnaryFuture`] is what unary callables return. It resolves exactly once,
//! to a response or to the chain's error type, and can be cancelled through a
//! [`CancelHandle`] from anywhere, even after the future itself has been
//! moved into another task.
//!
//! # Cancellation
//!
//! Cancelling stops polling the transport future and drops it, which is how
//! a Rust transport observes cancellation. The `UnaryFuture` then resolves to
//! the error type's cancelled value (see [`Cancelled`]); a response that
//! arrives later is never delivered. Dropping the `UnaryFuture` cancels the
//! call as well.
//!
//! Decorators transform results with [`map_err`](UnaryFuture::map_err) and
//! [`map_ok`](UnaryFuture::map_ok), which keep the same cancel handle, so
//! cancelling the outermost future always reaches the innermost call.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{AbortHandle, Abortable, Aborted, BoxFuture, Shared};
use futures::{FutureExt, TryFutureExt};

/// Marker converted into an error type when a call is cancelled locally.
///
/// Error types used as the failure of a [`UnaryFuture`] implement
/// `From<Cancelled>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("call cancelled")]
pub struct Cancelled;

/// A handle that cancels an in-flight [`UnaryFuture`].
#[derive(Clone, Debug)]
pub struct CancelHandle {
    abort: AbortHandle,
}

impl CancelHandle {
    /// Cancel the call. Has no effect if the call already resolved.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    /// Returns whether [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.abort.is_aborted()
    }
}

/// The pending result of a unary call.
#[must_use = "futures do nothing unless awaited; dropping a UnaryFuture cancels the call"]
pub struct UnaryFuture<T, E> {
    inner: BoxFuture<'static, Result<T, E>>,
    handle: CancelHandle,
}

impl<T, E> UnaryFuture<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Wrap a call future, making it cancellable.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: From<Cancelled>,
    {
        let (abort, registration) = AbortHandle::new_pair();
        let inner = Abortable::new(future, registration)
            .map(|outcome| match outcome {
                Ok(result) => result,
                Err(Aborted) => Err(E::from(Cancelled)),
            })
            .boxed();

        Self {
            inner,
            handle: CancelHandle { abort },
        }
    }

    /// Create a future that is already resolved.
    pub fn ready(result: Result<T, E>) -> Self
    where
        E: From<Cancelled>,
    {
        Self::new(futures::future::ready(result))
    }

    /// Get a handle that cancels this call.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.handle.clone()
    }

    /// Cancel this call.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Returns whether this call was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    /// Transform the failure, keeping the cancel handle.
    pub fn map_err<E2, F>(self, f: F) -> UnaryFuture<T, E2>
    where
        F: FnOnce(E) -> E2 + Send + 'static,
        E2: Send + 'static,
    {
        UnaryFuture {
            inner: self.inner.map_err(f).boxed(),
            handle: self.handle,
        }
    }

    /// Transform the response, keeping the cancel handle.
    pub fn map_ok<T2, F>(self, f: F) -> UnaryFuture<T2, E>
    where
        F: FnOnce(T) -> T2 + Send + 'static,
        T2: Send + 'static,
    {
        UnaryFuture {
            inner: self.inner.map_ok(f).boxed(),
            handle: self.handle,
        }
    }

    /// Turn this future into one that can be awaited by several consumers,
    /// including ones that subscribe after it resolved.
    pub fn into_shared(self) -> Shared<Self>
    where
        T: Clone,
        E: Clone,
    {
        FutureExt::shared(self)
    }
}

impl<T, E> Future for UnaryFuture<T, E> {
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl<T, E> fmt::Debug for UnaryFuture<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnaryFuture")
            .field("cancelled", &self.handle.is_cancelled())
            .finish()
    }
}
