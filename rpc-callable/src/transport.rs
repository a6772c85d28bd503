//! Transport seam for the call layer.
//!
//! A transport adapter plugs into this crate by implementing [`Channel`].
//! Channels work on encoded message bytes; typed messages are converted by
//! the [`Marshaller`](crate::Marshaller)s of a
//! [`MethodDescriptor`](crate::MethodDescriptor) before they reach the
//! channel. Failures are reported as [`TransportError`], which carries the
//! transport's numeric status code when it has one.
//!
//! # Example
//!
//! ```ignore
//! use rpc_callable::{CallContext, CallOptions, Channel, TransportChannel, TransportError};
//!
//! #[derive(Debug)]
//! struct LoopbackChannel;
//!
//! impl Channel for LoopbackChannel {
//!     fn unary(
//!         &self,
//!         _method: &str,
//!         request: Bytes,
//!         _options: CallOptions,
//!     ) -> BoxFuture<'static, Result<Bytes, TransportError>> {
//!         Box::pin(async move { Ok(request) })
//!     }
//! }
//!
//! let context = CallContext::new().with_transport_channel(TransportChannel::new(LoopbackChannel));
//! ```

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use rpc_callable_core::{Code, Status};

use crate::future::Cancelled;
use crate::options::CallOptions;
use crate::streaming::BoxObserver;

/// Request messages of a client-streaming call, already encoded.
///
/// An `Err` item means the request side failed locally (the caller cancelled
/// or a message could not be encoded); the transport should abort the call
/// and report that error to the response observer.
pub type RequestBytes = BoxStream<'static, Result<Bytes, TransportError>>;

/// A connection-level abstraction capable of opening calls.
///
/// Implementations own their execution context: futures returned by
/// [`unary`](Channel::unary) are driven by whoever awaits them, while
/// [`client_streaming`](Channel::client_streaming) hands the request stream
/// and response observer to the transport, which delivers results on its own
/// tasks or threads.
///
/// Dropping a future returned by `unary` must cancel the underlying call.
pub trait Channel: fmt::Debug + Send + Sync + 'static {
    /// Issue one unary call.
    fn unary(
        &self,
        method: &str,
        request: Bytes,
        options: CallOptions,
    ) -> BoxFuture<'static, Result<Bytes, TransportError>>;

    /// Issue one client-streaming call.
    ///
    /// The transport must forward request messages in stream order and signal
    /// exactly one terminal event on `responses`. A successful call sends
    /// exactly one response before `on_completed`; the direct callable turns
    /// a second response or a completion without one into an `Internal`
    /// error.
    ///
    /// The default implementation reports `Unimplemented`.
    fn client_streaming(
        &self,
        method: &str,
        requests: RequestBytes,
        mut responses: BoxObserver<Bytes, TransportError>,
        options: CallOptions,
    ) {
        let _ = (requests, options);
        responses.on_error(TransportError::new(
            Code::Unimplemented,
            format!("client streaming is not supported for {}", method),
        ));
    }
}

/// A shareable handle to a [`Channel`], stored in a
/// [`CallContext`](crate::CallContext).
#[derive(Clone)]
pub struct TransportChannel {
    inner: Arc<dyn Channel>,
}

impl TransportChannel {
    /// Wrap a channel implementation.
    pub fn new<C: Channel>(channel: C) -> Self {
        Self {
            inner: Arc::new(channel),
        }
    }

    /// Wrap an already shared channel implementation.
    pub fn from_arc(channel: Arc<dyn Channel>) -> Self {
        Self { inner: channel }
    }

    /// Get the underlying channel.
    pub fn channel(&self) -> &dyn Channel {
        self.inner.as_ref()
    }

    /// Returns whether both handles refer to the same channel instance.
    pub fn same_channel(&self, other: &TransportChannel) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for TransportChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TransportChannel").field(&self.inner).finish()
    }
}

/// A failure reported by a transport.
///
/// The status code is kept in its raw numeric form so that statuses this
/// crate does not recognize, or failures without any status, survive until
/// they are normalized by an [`ApiExceptionFactory`](crate::ApiExceptionFactory).
#[derive(Clone, Debug)]
pub struct TransportError {
    status: Option<i32>,
    message: String,
    source: Option<Arc<dyn Error + Send + Sync>>,
}

impl TransportError {
    /// Create an error carrying a known status code.
    pub fn new<S: Into<String>>(code: Code, message: S) -> Self {
        Self::from_raw_status(code as i32, message)
    }

    /// Create an error carrying a numeric status code as received from the wire.
    pub fn from_raw_status<S: Into<String>>(status: i32, message: S) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            source: None,
        }
    }

    /// Create an error for a failure that has no status information at all,
    /// such as a broken connection.
    pub fn without_status<S: Into<String>>(message: S) -> Self {
        Self {
            status: None,
            message: message.into(),
            source: None,
        }
    }

    /// Create the error reported when a call is cancelled locally.
    pub fn cancelled() -> Self {
        Self::new(Code::Canceled, "call cancelled")
    }

    /// Attach the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Get the raw status code, if the transport reported one.
    pub fn raw_status(&self) -> Option<i32> {
        self.status
    }

    /// Get the status code, mapping missing or unrecognized statuses to
    /// [`Code::Unknown`].
    pub fn code(&self) -> Code {
        self.status
            .and_then(Code::from_i32)
            .unwrap_or(Code::Unknown)
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(raw) => match Code::from_i32(raw) {
                Some(code) => write!(f, "{}: {}", code, self.message),
                None => write!(f, "status {}: {}", raw, self.message),
            },
            None => f.write_str(&self.message),
        }
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}

impl From<Status> for TransportError {
    fn from(status: Status) -> Self {
        let message = status.message().unwrap_or(status.code().as_str()).to_owned();
        Self::new(status.code(), message)
    }
}

impl From<Cancelled> for TransportError {
    fn from(_: Cancelled) -> Self {
        Self::cancelled()
    }
}
