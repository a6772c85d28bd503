//! Direct callables: the innermost layer of every call chain.
//!
//! [`DirectCallable`] and [`DirectClientStreamingCallable`] bind a
//! [`MethodDescriptor`] to whatever [`Channel`](crate::Channel) the call
//! context carries. They issue exactly one transport call per invocation and
//! add nothing else: no retries and no error translation.
//!
//! Failures are reported as raw [`TransportError`]s. Wrap a direct callable in
//! an [`ExceptionCallable`](crate::ExceptionCallable) to get normalized
//! [`ApiError`](crate::ApiError)s.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;

#[cfg(feature = "tracing")]
use tracing::{Instrument, info_span};

use crate::callable::{ClientStreamingCallable, UnaryCallable};
use crate::context::CallContext;
use crate::error::CallError;
use crate::future::{Cancelled, UnaryFuture};
use crate::method::{Marshaller, MethodDescriptor, MethodType};
use crate::streaming::{BoxObserver, RequestSink, StreamObserver, request_channel};
use crate::transport::{TransportChannel, TransportError};
use rpc_callable_core::Code;

fn resolve_channel<'a>(
    context: &'a CallContext,
    method: &str,
) -> Result<&'a TransportChannel, CallError> {
    context.transport_channel().ok_or_else(|| {
        CallError::Configuration(format!(
            "call context for {} has no transport channel",
            method
        ))
    })
}

fn check_method_type(
    actual: MethodType,
    expected: MethodType,
    method: &str,
) -> Result<(), CallError> {
    if actual == expected {
        Ok(())
    } else {
        Err(CallError::InvalidArgument(format!(
            "{} is a {} method, expected {}",
            method,
            actual.as_str(),
            expected.as_str()
        )))
    }
}

/// Issues unary calls for one method.
pub struct DirectCallable<Req, Res> {
    descriptor: MethodDescriptor<Req, Res>,
}

impl<Req, Res> DirectCallable<Req, Res> {
    /// Bind a unary method descriptor.
    ///
    /// Fails if the descriptor is not [`MethodType::Unary`].
    pub fn new(descriptor: MethodDescriptor<Req, Res>) -> Result<Self, CallError> {
        check_method_type(
            descriptor.method_type(),
            MethodType::Unary,
            descriptor.full_name(),
        )?;
        Ok(Self { descriptor })
    }

    /// Get the bound method descriptor.
    pub fn descriptor(&self) -> &MethodDescriptor<Req, Res> {
        &self.descriptor
    }
}

impl<Req, Res> UnaryCallable<Req, Res> for DirectCallable<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    type Error = TransportError;

    fn future_call(
        &self,
        request: Req,
        context: &CallContext,
    ) -> Result<UnaryFuture<Res, TransportError>, CallError> {
        let method = self.descriptor.full_name();
        let channel = resolve_channel(context, method)?;
        let options = context.call_options();

        #[cfg(feature = "tracing")]
        let span = info_span!(
            "rpc.call",
            rpc.method = %method,
            rpc.type = MethodType::Unary.as_str(),
            otel.kind = "client",
        );

        let body = match self.descriptor.request_marshaller().encode(&request) {
            Ok(body) => body,
            Err(err) => return Ok(UnaryFuture::ready(Err(err))),
        };
        #[cfg(feature = "tracing")]
        let call = span.in_scope(|| channel.channel().unary(method, body, options));
        #[cfg(not(feature = "tracing"))]
        let call = channel.channel().unary(method, body, options);

        let marshaller = Arc::clone(self.descriptor.response_marshaller());
        let response = async move {
            let body = call.await?;
            marshaller.decode(body)
        };

        #[cfg(feature = "tracing")]
        let response = response.instrument(span);

        Ok(UnaryFuture::new(response))
    }
}

impl<Req, Res> fmt::Display for DirectCallable<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "direct({})", self.descriptor.full_name())
    }
}

impl<Req, Res> fmt::Debug for DirectCallable<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectCallable")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// Issues client-streaming calls for one method.
pub struct DirectClientStreamingCallable<Req, Res> {
    descriptor: MethodDescriptor<Req, Res>,
}

impl<Req, Res> DirectClientStreamingCallable<Req, Res> {
    /// Bind a client-streaming method descriptor.
    ///
    /// Fails if the descriptor is not [`MethodType::ClientStreaming`].
    pub fn new(descriptor: MethodDescriptor<Req, Res>) -> Result<Self, CallError> {
        check_method_type(
            descriptor.method_type(),
            MethodType::ClientStreaming,
            descriptor.full_name(),
        )?;
        Ok(Self { descriptor })
    }

    /// Get the bound method descriptor.
    pub fn descriptor(&self) -> &MethodDescriptor<Req, Res> {
        &self.descriptor
    }
}

impl<Req, Res> ClientStreamingCallable<Req, Res> for DirectClientStreamingCallable<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    type Error = TransportError;

    fn client_streaming_call(
        &self,
        observer: BoxObserver<Res, TransportError>,
        context: &CallContext,
    ) -> Result<RequestSink<Req>, CallError> {
        let method = self.descriptor.full_name();
        let channel = resolve_channel(context, method)?;
        let options = context.call_options();

        #[cfg(feature = "tracing")]
        let _span = info_span!(
            "rpc.call",
            rpc.method = %method,
            rpc.type = MethodType::ClientStreaming.as_str(),
            otel.kind = "client",
        )
        .entered();

        let (sink, requests) = request_channel::<Req>();
        let marshaller = Arc::clone(self.descriptor.request_marshaller());
        let requests = requests
            .map(move |item| match item {
                Ok(message) => marshaller.encode(&message),
                Err(Cancelled) => Err(TransportError::cancelled()),
            })
            .boxed();

        let responses = Box::new(DecodingObserver::new(
            observer,
            Arc::clone(self.descriptor.response_marshaller()),
        ));

        channel
            .channel()
            .client_streaming(method, requests, responses, options);
        Ok(sink)
    }
}

impl<Req, Res> fmt::Display for DirectClientStreamingCallable<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "direct({})", self.descriptor.full_name())
    }
}

impl<Req, Res> fmt::Debug for DirectClientStreamingCallable<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectClientStreamingCallable")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// Decodes response bytes for the caller's observer.
///
/// The caller sees either one response followed by completion or a single
/// error. The decoded response is held until the transport completes, so a
/// transport that sends a second response, completes without one or fails
/// after responding produces only the error.
struct DecodingObserver<Res> {
    inner: BoxObserver<Res, TransportError>,
    marshaller: Arc<dyn Marshaller<Res>>,
    response: Option<Res>,
    terminated: bool,
}

impl<Res> DecodingObserver<Res> {
    fn new(inner: BoxObserver<Res, TransportError>, marshaller: Arc<dyn Marshaller<Res>>) -> Self {
        Self {
            inner,
            marshaller,
            response: None,
            terminated: false,
        }
    }

    fn fail(&mut self, error: TransportError) {
        self.terminated = true;
        self.response = None;
        self.inner.on_error(error);
    }
}

impl<Res: Send> StreamObserver<Bytes, TransportError> for DecodingObserver<Res> {
    fn on_next(&mut self, value: Bytes) {
        if self.terminated {
            return;
        }
        if self.response.is_some() {
            self.fail(TransportError::new(
                Code::Internal,
                "client-streaming call received more than one response",
            ));
            return;
        }
        match self.marshaller.decode(value) {
            Ok(message) => self.response = Some(message),
            Err(err) => self.fail(err),
        }
    }

    fn on_error(&mut self, error: TransportError) {
        if !self.terminated {
            self.fail(error);
        }
    }

    fn on_completed(&mut self) {
        if self.terminated {
            return;
        }
        match self.response.take() {
            Some(message) => {
                self.terminated = true;
                self.inner.on_next(message);
                self.inner.on_completed();
            }
            None => self.fail(TransportError::new(
                Code::Internal,
                "client-streaming call completed with no response",
            )),
        }
    }
}
