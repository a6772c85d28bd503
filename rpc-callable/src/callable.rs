//! Callable traits.
//!
//! A callable is one remotely invocable operation. Every layer of a call
//! chain, from the [`DirectCallable`](crate::DirectCallable) that talks to
//! the transport to the decorators wrapped around it, implements the same
//! trait, so features compose by wrapping:
//!
//! ```text
//! exception(direct(echo.v1.EchoService/Echo))
//! ```
//!
//! Callables are built once when a client is assembled and shared for its
//! lifetime. They hold no per-call state: two invocations with the same
//! request and context never interfere.
//!
//! # Decorators
//!
//! A decorator must:
//! - forward the context it was given to the inner callable, changing only
//!   fields it is documented to override;
//! - produce exactly one outcome for each outcome it receives, transforming
//!   at most its payload;
//! - keep cancellation flowing, which [`UnaryFuture::map_err`] and
//!   [`UnaryFuture::map_ok`] do;
//! - describe itself through `Display` by wrapping the inner description.

use std::fmt;
use std::sync::Arc;

use crate::context::CallContext;
use crate::error::CallError;
use crate::future::UnaryFuture;
use crate::streaming::{BoxObserver, RequestSink};

/// A unary operation: one request, one response.
pub trait UnaryCallable<Req, Res>: fmt::Display + Send + Sync {
    /// The failure type delivered through the returned future.
    type Error: Send + 'static;

    /// Start a call.
    ///
    /// Returns `Err` synchronously when the call cannot be started at all;
    /// everything that happens after the transport call is issued is
    /// delivered through the future.
    fn future_call(
        &self,
        request: Req,
        context: &CallContext,
    ) -> Result<UnaryFuture<Res, Self::Error>, CallError>;
}

/// A client-streaming operation: many requests, one response.
pub trait ClientStreamingCallable<Req, Res>: fmt::Display + Send + Sync {
    /// The failure type delivered to the response observer.
    type Error: Send + 'static;

    /// Start a call, returning the sink that accepts request messages.
    ///
    /// `observer` receives the single response followed by completion, or a
    /// single error.
    fn client_streaming_call(
        &self,
        observer: BoxObserver<Res, Self::Error>,
        context: &CallContext,
    ) -> Result<RequestSink<Req>, CallError>;
}

impl<Req, Res, C> UnaryCallable<Req, Res> for Arc<C>
where
    C: UnaryCallable<Req, Res> + ?Sized,
{
    type Error = C::Error;

    fn future_call(
        &self,
        request: Req,
        context: &CallContext,
    ) -> Result<UnaryFuture<Res, Self::Error>, CallError> {
        (**self).future_call(request, context)
    }
}

impl<Req, Res, C> UnaryCallable<Req, Res> for Box<C>
where
    C: UnaryCallable<Req, Res> + ?Sized,
{
    type Error = C::Error;

    fn future_call(
        &self,
        request: Req,
        context: &CallContext,
    ) -> Result<UnaryFuture<Res, Self::Error>, CallError> {
        (**self).future_call(request, context)
    }
}

impl<Req, Res, C> ClientStreamingCallable<Req, Res> for Arc<C>
where
    C: ClientStreamingCallable<Req, Res> + ?Sized,
{
    type Error = C::Error;

    fn client_streaming_call(
        &self,
        observer: BoxObserver<Res, Self::Error>,
        context: &CallContext,
    ) -> Result<RequestSink<Req>, CallError> {
        (**self).client_streaming_call(observer, context)
    }
}

impl<Req, Res, C> ClientStreamingCallable<Req, Res> for Box<C>
where
    C: ClientStreamingCallable<Req, Res> + ?Sized,
{
    type Error = C::Error;

    fn client_streaming_call(
        &self,
        observer: BoxObserver<Res, Self::Error>,
        context: &CallContext,
    ) -> Result<RequestSink<Req>, CallError> {
        (**self).client_streaming_call(observer, context)
    }
}

/// A type-erased, shareable unary callable.
pub type SharedUnaryCallable<Req, Res, E> = Arc<dyn UnaryCallable<Req, Res, Error = E>>;

/// A type-erased, shareable client-streaming callable.
pub type SharedClientStreamingCallable<Req, Res, E> =
    Arc<dyn ClientStreamingCallable<Req, Res, Error = E>>;
