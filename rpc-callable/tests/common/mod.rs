//! In-process echo service shared by the integration tests.

#![allow(dead_code)]

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use futures::future::BoxFuture;
use rpc_callable::{
    BoxObserver, CallContext, CallError, CallOptions, Channel, Code, JsonMarshaller,
    MethodDescriptor, RequestBytes, TransportChannel, TransportError, UnaryCallable, UnaryFuture,
};
use serde::{Deserialize, Serialize};

pub const ECHO: &str = "echo.v1.EchoService/Echo";
pub const COLLECT: &str = "echo.v1.EchoService/Collect";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EchoRequest {
    pub message: String,
}

impl EchoRequest {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// What the service saw, echoed back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EchoResponse {
    pub message: String,
    pub channel: String,
    pub timeout_ms: Option<u64>,
    pub request_id: Option<String>,
    pub api_key: Option<String>,
}

/// Extension: make the service wait before answering.
#[derive(Clone, Debug)]
pub struct Delay(pub Duration);

/// Extension: make the service fail the call.
#[derive(Clone, Debug)]
pub enum Fail {
    Status(i32),
    NoStatus,
}

/// Credential value understood by the echo service.
#[derive(Clone, Debug)]
pub struct ApiKey(pub String);

/// Echo service reached through an in-process channel.
///
/// Unary calls honor the call timeout the way a network transport would.
/// Client-streaming calls run on a spawned task.
#[derive(Debug)]
pub struct EchoChannel {
    name: String,
}

pub fn echo_channel(name: &str) -> TransportChannel {
    TransportChannel::new(EchoChannel {
        name: name.to_owned(),
    })
}

pub fn echo_descriptor() -> MethodDescriptor<EchoRequest, EchoResponse> {
    MethodDescriptor::unary(ECHO, JsonMarshaller::new(), JsonMarshaller::new())
        .expect("valid method name")
}

pub fn collect_descriptor() -> MethodDescriptor<EchoRequest, EchoResponse> {
    MethodDescriptor::client_streaming(COLLECT, JsonMarshaller::new(), JsonMarshaller::new())
        .expect("valid method name")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}

fn respond(name: &str, message: String, options: &CallOptions) -> Result<Bytes, TransportError> {
    if let Some(fail) = options.extensions().get::<Fail>() {
        return Err(match fail {
            Fail::Status(raw) => TransportError::from_raw_status(*raw, "injected failure"),
            Fail::NoStatus => TransportError::without_status("connection reset"),
        });
    }

    let response = EchoResponse {
        message,
        channel: name.to_owned(),
        timeout_ms: options.timeout().map(|t| t.as_millis() as u64),
        request_id: options
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        api_key: options
            .credentials()
            .and_then(|c| c.downcast_ref::<ApiKey>())
            .map(|k| k.0.clone()),
    };
    serde_json::to_vec(&response)
        .map(Bytes::from)
        .map_err(|e| TransportError::new(Code::Internal, e.to_string()))
}

fn decode_request(bytes: &[u8]) -> Result<EchoRequest, TransportError> {
    serde_json::from_slice(bytes).map_err(|e| TransportError::new(Code::InvalidArgument, e.to_string()))
}

impl Channel for EchoChannel {
    fn unary(
        &self,
        method: &str,
        request: Bytes,
        options: CallOptions,
    ) -> BoxFuture<'static, Result<Bytes, TransportError>> {
        let name = self.name.clone();
        let method = method.to_owned();
        Box::pin(async move {
            let call = async {
                if let Some(Delay(delay)) = options.extensions().get::<Delay>() {
                    tokio::time::sleep(*delay).await;
                }
                if method != ECHO {
                    return Err(TransportError::new(
                        Code::Unimplemented,
                        format!("unknown method {}", method),
                    ));
                }
                let request = decode_request(&request)?;
                respond(&name, request.message, &options)
            };

            match options.timeout() {
                Some(timeout) => tokio::time::timeout(timeout, call)
                    .await
                    .unwrap_or_else(|_| {
                        Err(TransportError::new(
                            Code::DeadlineExceeded,
                            "deadline exceeded",
                        ))
                    }),
                None => call.await,
            }
        })
    }

    fn client_streaming(
        &self,
        method: &str,
        mut requests: RequestBytes,
        mut responses: BoxObserver<Bytes, TransportError>,
        options: CallOptions,
    ) {
        if method != COLLECT {
            responses.on_error(TransportError::new(
                Code::Unimplemented,
                format!("unknown method {}", method),
            ));
            return;
        }

        let name = self.name.clone();
        tokio::spawn(async move {
            let mut messages = Vec::new();
            while let Some(item) = requests.next().await {
                let request = item.and_then(|bytes| decode_request(&bytes));
                match request {
                    Ok(request) => messages.push(request.message),
                    Err(err) => {
                        responses.on_error(err);
                        return;
                    }
                }
            }

            match respond(&name, messages.join(","), &options) {
                Ok(body) => {
                    responses.on_next(body);
                    responses.on_completed();
                }
                Err(err) => responses.on_error(err),
            }
        });
    }
}

/// A decorator that adds nothing.
pub struct Passthrough<C>(pub C);

impl<Req, Res, C> UnaryCallable<Req, Res> for Passthrough<C>
where
    C: UnaryCallable<Req, Res>,
{
    type Error = C::Error;

    fn future_call(
        &self,
        request: Req,
        context: &CallContext,
    ) -> Result<UnaryFuture<Res, C::Error>, CallError> {
        self.0.future_call(request, context)
    }
}

impl<C: fmt::Display> fmt::Display for Passthrough<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "passthrough({})", self.0)
    }
}
