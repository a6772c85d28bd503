//! Call chain assembly.
//!
//! [`Callables`] builds the standard chain for a method,
//! `exception(direct(method))`, from a [`MethodDescriptor`] and
//! [`CallSettings`]. [`ClientCallable`] binds a chain to a client's default
//! [`CallContext`], so call sites may pass a context or fall back to the
//! default.
//!
//! # Example
//!
//! ```ignore
//! use rpc_callable::{CallContext, CallSettings, Callables, ClientCallable, TransportChannel};
//!
//! let settings = CallSettings::new().timeout(Duration::from_secs(5));
//! let echo = ClientCallable::with_settings(
//!     Callables::unary(descriptor, &settings)?,
//!     CallContext::new().with_transport_channel(TransportChannel::new(channel)),
//!     &settings,
//! );
//!
//! // Uses the default context.
//! let response = echo.call(request, None)?.await?;
//! ```

use std::fmt;

use crate::callable::{ClientStreamingCallable, UnaryCallable};
use crate::config::CallSettings;
use crate::context::CallContext;
use crate::direct::{DirectCallable, DirectClientStreamingCallable};
use crate::error::CallError;
use crate::exception::{ExceptionCallable, ExceptionClientStreamingCallable};
use crate::future::UnaryFuture;
use crate::method::MethodDescriptor;
use crate::streaming::{BoxObserver, RequestSink};

/// Builds standard call chains.
#[derive(Clone, Copy, Debug)]
pub struct Callables;

impl Callables {
    /// Build `exception(direct(method))` for a unary method.
    pub fn unary<Req, Res>(
        descriptor: MethodDescriptor<Req, Res>,
        settings: &CallSettings,
    ) -> Result<ExceptionCallable<DirectCallable<Req, Res>>, CallError> {
        settings.validate()?;
        let direct = DirectCallable::new(descriptor)?;
        Ok(ExceptionCallable::new(direct, settings.exception_factory()))
    }

    /// Build `exception(direct(method))` for a client-streaming method.
    pub fn client_streaming<Req, Res>(
        descriptor: MethodDescriptor<Req, Res>,
        settings: &CallSettings,
    ) -> Result<ExceptionClientStreamingCallable<DirectClientStreamingCallable<Req, Res>>, CallError>
    {
        settings.validate()?;
        let direct = DirectClientStreamingCallable::new(descriptor)?;
        Ok(ExceptionClientStreamingCallable::new(
            direct,
            settings.exception_factory(),
        ))
    }
}

/// A call chain bound to a client's default context.
///
/// A context passed to [`call`](Self::call) or
/// [`client_streaming_call`](Self::client_streaming_call) replaces the default
/// entirely; it is not merged. Callers that want to override single fields
/// build their context with `client.default_context().merge(&overrides)`.
#[derive(Clone, Debug)]
pub struct ClientCallable<C> {
    inner: C,
    default_context: CallContext,
}

impl<C> ClientCallable<C> {
    pub fn new(inner: C, default_context: CallContext) -> Self {
        Self {
            inner,
            default_context,
        }
    }

    /// Bind a chain, applying the settings to the default context.
    pub fn with_settings(inner: C, default_context: CallContext, settings: &CallSettings) -> Self {
        Self::new(inner, settings.apply(&default_context))
    }

    /// Get the wrapped chain.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Get the default context.
    pub fn default_context(&self) -> &CallContext {
        &self.default_context
    }

    /// Returns the context a call with `context` runs with.
    pub fn resolve_context(&self, context: Option<&CallContext>) -> CallContext {
        self.default_context.null_to_self(context)
    }

    /// Start a unary call.
    pub fn call<Req, Res>(
        &self,
        request: Req,
        context: Option<&CallContext>,
    ) -> Result<UnaryFuture<Res, <C as UnaryCallable<Req, Res>>::Error>, CallError>
    where
        C: UnaryCallable<Req, Res>,
    {
        self.inner.future_call(request, &self.resolve_context(context))
    }

    /// Start a client-streaming call.
    pub fn client_streaming_call<Req, Res>(
        &self,
        observer: BoxObserver<Res, <C as ClientStreamingCallable<Req, Res>>::Error>,
        context: Option<&CallContext>,
    ) -> Result<RequestSink<Req>, CallError>
    where
        C: ClientStreamingCallable<Req, Res>,
    {
        self.inner
            .client_streaming_call(observer, &self.resolve_context(context))
    }
}

impl<C: fmt::Display> fmt::Display for ClientCallable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::{JsonMarshaller, MethodType};
    use crate::testing::{RecordingChannel, echo_unary};
    use rpc_callable_core::Code;
    use std::time::Duration;

    fn descriptor(method_type: MethodType) -> MethodDescriptor<String, String> {
        MethodDescriptor::new(
            "echo.v1.EchoService/Echo",
            method_type,
            JsonMarshaller::new(),
            JsonMarshaller::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_callables_build_standard_chain() {
        let settings = CallSettings::new();
        let unary = Callables::unary(descriptor(MethodType::Unary), &settings).unwrap();
        assert_eq!(unary.to_string(), "exception(direct(echo.v1.EchoService/Echo))");

        let streaming =
            Callables::client_streaming(descriptor(MethodType::ClientStreaming), &settings)
                .unwrap();
        assert_eq!(
            streaming.to_string(),
            "exception(direct(echo.v1.EchoService/Echo))"
        );
    }

    #[test]
    fn test_callables_reject_mismatched_method_type() {
        let settings = CallSettings::new();
        let err = Callables::unary(descriptor(MethodType::ClientStreaming), &settings).unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);

        let err =
            Callables::client_streaming(descriptor(MethodType::Unary), &settings).unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
    }

    #[test]
    fn test_callables_reject_invalid_settings() {
        let settings = CallSettings::new().timeout(Duration::ZERO);
        assert!(Callables::unary(descriptor(MethodType::Unary), &settings).is_err());
    }

    #[tokio::test]
    async fn test_client_callable_falls_back_to_default_context() {
        let channel = RecordingChannel::new(echo_unary);
        let settings = CallSettings::new().timeout(Duration::from_secs(5));
        let client = ClientCallable::with_settings(
            Callables::unary(descriptor(MethodType::Unary), &settings).unwrap(),
            CallContext::new().with_transport_channel(channel.handle()),
            &settings,
        );
        assert_eq!(
            client.default_context().timeout(),
            Some(Duration::from_secs(5))
        );

        let response: String = client.call("hi".to_string(), None).unwrap().await.unwrap();
        assert_eq!(response, "hi");

        let other = RecordingChannel::new(echo_unary);
        let explicit = CallContext::new().with_transport_channel(other.handle());
        let _: String = client
            .call("there".to_string(), Some(&explicit))
            .unwrap()
            .await
            .unwrap();

        let calls = channel.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].timeout, Some(Duration::from_secs(5)));

        // the explicit context replaces the default, timeout included
        let calls = other.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].timeout, None);
    }

    #[test]
    fn test_client_callable_explicit_context_without_channel() {
        let channel = RecordingChannel::new(echo_unary);
        let client = ClientCallable::new(
            Callables::unary(descriptor(MethodType::Unary), &CallSettings::new()).unwrap(),
            CallContext::new().with_transport_channel(channel.handle()),
        );

        let err = client
            .call::<String, String>("hi".to_string(), Some(&CallContext::new()))
            .unwrap_err();
        assert!(matches!(err, CallError::Configuration(_)));
        assert!(channel.calls().is_empty());
    }
}
