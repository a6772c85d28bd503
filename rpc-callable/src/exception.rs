//! Exception translation.
//!
//! Transports fail with [`TransportError`]s that may carry any numeric status,
//! or none at all. [`ApiExceptionFactory`] turns them into [`ApiError`]s with a
//! status [`Code`] from the fixed set and a `retryable` flag taken from a
//! caller-supplied set of codes.
//!
//! [`ExceptionCallable`] and [`ExceptionClientStreamingCallable`] apply the
//! factory to every failure of the callable they wrap; successes pass through
//! untouched.
//!
//! # Example
//!
//! ```ignore
//! use rpc_callable::{ApiExceptionFactory, Code, DirectCallable, ExceptionCallable};
//!
//! let factory = ApiExceptionFactory::new([Code::Unavailable]);
//! let callable = ExceptionCallable::new(DirectCallable::new(descriptor)?, factory);
//!
//! match callable.future_call(request, &context)?.await {
//!     Ok(response) => println!("{:?}", response),
//!     Err(err) if err.is_retryable() => println!("try again: {}", err),
//!     Err(err) => println!("failed: {}", err),
//! }
//! ```

use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use rpc_callable_core::{Code, Status};

use crate::callable::{ClientStreamingCallable, UnaryCallable};
use crate::context::CallContext;
use crate::error::CallError;
use crate::future::{Cancelled, UnaryFuture};
use crate::streaming::{BoxObserver, RequestSink, StreamObserver};
use crate::transport::TransportError;

/// A transport-independent call failure.
#[derive(Clone, Debug)]
pub struct ApiError {
    status: Status,
    retryable: bool,
    cause: Option<Arc<dyn Error + Send + Sync>>,
}

impl ApiError {
    /// Create an error without an underlying cause.
    pub fn new<S: Into<String>>(code: Code, message: S, retryable: bool) -> Self {
        Self {
            status: Status::new(code, message),
            retryable,
            cause: None,
        }
    }

    /// Attach the underlying cause.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Get the status code.
    pub fn code(&self) -> Code {
        self.status.code()
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        self.status.message().unwrap_or(self.status.code().as_str())
    }

    /// Returns whether the failed call may be retried.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Get the code and message as a [`Status`].
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Get the original failure this error was translated from.
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn Error + 'static))
    }
}

impl From<Cancelled> for ApiError {
    fn from(cancelled: Cancelled) -> Self {
        ApiError::new(Code::Canceled, cancelled.to_string(), false).with_cause(cancelled)
    }
}

impl From<CallError> for ApiError {
    fn from(err: CallError) -> Self {
        ApiError::new(err.code(), err.to_string(), false).with_cause(err)
    }
}

/// Translates transport failures into [`ApiError`]s.
///
/// The retryable set is fixed at construction. Clones share it, so every
/// decorator built from one factory classifies failures identically.
#[derive(Clone, Debug, Default)]
pub struct ApiExceptionFactory {
    retryable_codes: Arc<HashSet<Code>>,
}

impl ApiExceptionFactory {
    /// Create a factory that marks the given codes as retryable.
    pub fn new<I>(retryable_codes: I) -> Self
    where
        I: IntoIterator<Item = Code>,
    {
        Self {
            retryable_codes: Arc::new(retryable_codes.into_iter().collect()),
        }
    }

    /// Get the codes this factory marks as retryable.
    pub fn retryable_codes(&self) -> &HashSet<Code> {
        &self.retryable_codes
    }

    /// Returns whether failures with `code` are marked retryable.
    pub fn is_retryable(&self, code: Code) -> bool {
        self.retryable_codes.contains(&code)
    }

    /// Translate a transport failure.
    ///
    /// Never fails: a missing or unrecognized status becomes
    /// [`Code::Unknown`] and an empty message is replaced by the code name.
    pub fn create(&self, error: TransportError) -> ApiError {
        let code = error.code();
        let retryable = self.is_retryable(code);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            code = %code,
            raw_status = ?error.raw_status(),
            retryable,
            "translated transport error"
        );

        let message = if error.message().is_empty() {
            code.as_str().to_owned()
        } else {
            error.message().to_owned()
        };
        ApiError::new(code, message, retryable).with_cause(error)
    }
}

/// Translates the failures of a unary callable.
#[derive(Clone, Debug)]
pub struct ExceptionCallable<C> {
    inner: C,
    factory: ApiExceptionFactory,
}

impl<C> ExceptionCallable<C> {
    pub fn new(inner: C, factory: ApiExceptionFactory) -> Self {
        Self { inner, factory }
    }

    /// Get the wrapped callable.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Get the factory used for translation.
    pub fn factory(&self) -> &ApiExceptionFactory {
        &self.factory
    }
}

impl<Req, Res, C> UnaryCallable<Req, Res> for ExceptionCallable<C>
where
    C: UnaryCallable<Req, Res, Error = TransportError>,
    Res: Send + 'static,
{
    type Error = ApiError;

    fn future_call(
        &self,
        request: Req,
        context: &CallContext,
    ) -> Result<UnaryFuture<Res, ApiError>, CallError> {
        let factory = self.factory.clone();
        let future = self.inner.future_call(request, context)?;
        Ok(future.map_err(move |err| factory.create(err)))
    }
}

impl<C: fmt::Display> fmt::Display for ExceptionCallable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exception({})", self.inner)
    }
}

/// Translates the failures of a client-streaming callable.
#[derive(Clone, Debug)]
pub struct ExceptionClientStreamingCallable<C> {
    inner: C,
    factory: ApiExceptionFactory,
}

impl<C> ExceptionClientStreamingCallable<C> {
    pub fn new(inner: C, factory: ApiExceptionFactory) -> Self {
        Self { inner, factory }
    }

    /// Get the wrapped callable.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Get the factory used for translation.
    pub fn factory(&self) -> &ApiExceptionFactory {
        &self.factory
    }
}

impl<Req, Res, C> ClientStreamingCallable<Req, Res> for ExceptionClientStreamingCallable<C>
where
    C: ClientStreamingCallable<Req, Res, Error = TransportError>,
    Res: Send + 'static,
{
    type Error = ApiError;

    fn client_streaming_call(
        &self,
        observer: BoxObserver<Res, ApiError>,
        context: &CallContext,
    ) -> Result<RequestSink<Req>, CallError> {
        let translating = Box::new(TranslatingObserver {
            inner: observer,
            factory: self.factory.clone(),
        });
        self.inner.client_streaming_call(translating, context)
    }
}

impl<C: fmt::Display> fmt::Display for ExceptionClientStreamingCallable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exception({})", self.inner)
    }
}

struct TranslatingObserver<Res> {
    inner: BoxObserver<Res, ApiError>,
    factory: ApiExceptionFactory,
}

impl<Res: Send> StreamObserver<Res, TransportError> for TranslatingObserver<Res> {
    fn on_next(&mut self, value: Res) {
        self.inner.on_next(value);
    }

    fn on_error(&mut self, error: TransportError) {
        self.inner.on_error(self.factory.create(error));
    }

    fn on_completed(&mut self) {
        self.inner.on_completed();
    }
}
