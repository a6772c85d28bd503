//! Transport-agnostic RPC call layer.
//!
//! This crate sits between generated client stubs and a transport. It models
//! each remote method as a *callable*, a shareable value that starts calls,
//! and lets features such as error translation be added by wrapping one
//! callable in another.
//!
//! ## Features
//!
//! - Unary calls returning a cancellable [`UnaryFuture`]
//! - Client streaming calls driven through a [`RequestSink`] and a
//!   [`StreamObserver`]
//! - Immutable per-call configuration with [`CallContext`]
//! - Translation of transport failures into [`ApiError`]s with a
//!   configurable retryable classification
//! - JSON and Protobuf message marshalling
//!
//! ## Example
//!
//! ```ignore
//! use rpc_callable::{
//!     CallContext, CallSettings, Callables, JsonMarshaller, MethodDescriptor, TransportChannel,
//! };
//!
//! let descriptor = MethodDescriptor::unary(
//!     "echo.v1.EchoService/Echo",
//!     JsonMarshaller::<EchoRequest>::new(),
//!     JsonMarshaller::<EchoResponse>::new(),
//! )?;
//! let echo = Callables::unary(descriptor, &CallSettings::new())?;
//!
//! let context = CallContext::new()
//!     .with_transport_channel(TransportChannel::new(my_channel))
//!     .with_timeout(Duration::from_secs(5));
//!
//! let response = echo.future_call(request, &context)?.await?;
//! ```
//!
//! ## Client Streaming Example
//!
//! ```ignore
//! use rpc_callable::{ClientStreamingCallable, StreamEvent, observer_channel};
//! use futures::StreamExt;
//!
//! let (observer, mut events) = observer_channel();
//! let mut sink = upload.client_streaming_call(observer, &context)?;
//! for chunk in chunks {
//!     sink.send(chunk)?;
//! }
//! sink.complete()?;
//!
//! while let Some(event) = events.next().await {
//!     match event {
//!         StreamEvent::Next(summary) => println!("Got: {:?}", summary),
//!         StreamEvent::Error(e) => eprintln!("Error: {}", e),
//!         StreamEvent::Completed => break,
//!     }
//! }
//! ```
//!
//! ## Call Chains
//!
//! The innermost callable is a [`DirectCallable`], which issues exactly one
//! transport call using the channel and options from the context it is given.
//! Decorators wrap it and describe the resulting chain through `Display`:
//!
//! ```text
//! exception(direct(echo.v1.EchoService/Echo))
//! ```
//!
//! [`Callables`] builds the standard chain from [`CallSettings`].
//!
//! ## Cancellation
//!
//! Call [`UnaryFuture::cancel`] (or a [`CancelHandle`] obtained from it), or
//! drop the future. The transport future is dropped and the call resolves to a
//! [`Code::Canceled`] failure. Client streaming calls are cancelled with
//! [`RequestSink::cancel`] or by dropping the sink before completing it.
//!
//! ## Timeouts
//!
//! A timeout set with [`CallContext::with_timeout`] is handed to the transport
//! in [`CallOptions`]; enforcing it is the transport's job. Timeouts bound one
//! transport call.
//!
//! ## Feature Flags
//!
//! | Feature | Description | Dependencies |
//! |---------|-------------|--------------|
//! | `tracing` | Tracing spans for RPC calls (default) | `tracing` |
//!
//! When enabled, each call creates a span with:
//! - `rpc.method`: Full method name (e.g., "package.Service/Method")
//! - `rpc.type`: Call type ("unary", "client_stream")
//! - `otel.kind`: "client"
//!
//! Failures translated by the exception layer are logged at `debug` level.

mod builder;
mod callable;
pub mod config;
mod context;
mod direct;
mod error;
mod exception;
mod future;
mod method;
mod options;
mod streaming;
pub mod transport;

#[cfg(test)]
mod testing;

pub use builder::{Callables, ClientCallable};
pub use callable::{
    ClientStreamingCallable, SharedClientStreamingCallable, SharedUnaryCallable, UnaryCallable,
};
pub use config::CallSettings;
pub use context::{CallContext, Credentials};
pub use direct::{DirectCallable, DirectClientStreamingCallable};
pub use error::{CallError, SinkError};
pub use exception::{
    ApiError, ApiExceptionFactory, ExceptionCallable, ExceptionClientStreamingCallable,
};
pub use future::{CancelHandle, Cancelled, UnaryFuture};
pub use method::{JsonMarshaller, Marshaller, MethodDescriptor, MethodType, ProstMarshaller};
pub use options::CallOptions;
pub use streaming::{
    BoxObserver, RequestSink, RequestStream, StreamEvent, StreamObserver, observer_channel,
    request_channel,
};
pub use transport::{Channel, RequestBytes, TransportChannel, TransportError};

// Re-export core types that users need
pub use rpc_callable_core::{Code, ParseCodeError, Status};

// Re-export types needed by transport implementations
pub use bytes::Bytes;
