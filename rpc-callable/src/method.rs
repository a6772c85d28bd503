//! Method descriptors and message marshalling.
//!
//! A [`MethodDescriptor`] names one remote operation and knows how to turn
//! its typed request and response messages into the bytes a
//! [`Channel`](crate::Channel) moves.
//!
//! Two stock marshallers are provided:
//! - [`JsonMarshaller`]: serde types as JSON
//! - [`ProstMarshaller`]: prost messages as binary protobuf

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use rpc_callable_core::Code;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CallError;
use crate::transport::TransportError;

/// Converts messages of type `T` to and from bytes.
///
/// Failures are reported as [`TransportError`]s with code
/// [`Code::Internal`], so they reach callers through the same path as any
/// other call failure.
pub trait Marshaller<T>: Send + Sync {
    /// Encode a message.
    fn encode(&self, message: &T) -> Result<Bytes, TransportError>;

    /// Decode a message.
    fn decode(&self, bytes: Bytes) -> Result<T, TransportError>;
}

/// Marshals serde types as JSON.
pub struct JsonMarshaller<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonMarshaller<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonMarshaller<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonMarshaller<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonMarshaller")
    }
}

impl<T> Marshaller<T> for JsonMarshaller<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, message: &T) -> Result<Bytes, TransportError> {
        serde_json::to_vec(message).map(Bytes::from).map_err(|e| {
            TransportError::new(Code::Internal, format!("failed to encode JSON message: {}", e))
                .with_source(e)
        })
    }

    fn decode(&self, bytes: Bytes) -> Result<T, TransportError> {
        serde_json::from_slice(&bytes).map_err(|e| {
            TransportError::new(Code::Internal, format!("failed to decode JSON message: {}", e))
                .with_source(e)
        })
    }
}

/// Marshals prost messages as binary protobuf.
pub struct ProstMarshaller<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> ProstMarshaller<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ProstMarshaller<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ProstMarshaller<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProstMarshaller")
    }
}

impl<T> Marshaller<T> for ProstMarshaller<T>
where
    T: prost::Message + Default,
{
    fn encode(&self, message: &T) -> Result<Bytes, TransportError> {
        Ok(Bytes::from(message.encode_to_vec()))
    }

    fn decode(&self, bytes: Bytes) -> Result<T, TransportError> {
        T::decode(bytes).map_err(|e| {
            TransportError::new(
                Code::Internal,
                format!("failed to decode protobuf message: {}", e),
            )
            .with_source(e)
        })
    }
}

/// The shape of a method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodType {
    Unary,
    ClientStreaming,
}

impl MethodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodType::Unary => "unary",
            MethodType::ClientStreaming => "client_stream",
        }
    }
}

/// Describes one remote operation.
///
/// The full name has the form `package.Service/Method`; a leading `/` is
/// accepted and stripped.
pub struct MethodDescriptor<Req, Res> {
    full_name: Arc<str>,
    method_type: MethodType,
    request: Arc<dyn Marshaller<Req>>,
    response: Arc<dyn Marshaller<Res>>,
}

impl<Req, Res> MethodDescriptor<Req, Res>
where
    Req: 'static,
    Res: 'static,
{
    /// Create a descriptor, validating the method name.
    pub fn new<M, N>(
        full_name: &str,
        method_type: MethodType,
        request: M,
        response: N,
    ) -> Result<Self, CallError>
    where
        M: Marshaller<Req> + 'static,
        N: Marshaller<Res> + 'static,
    {
        let full_name = full_name.strip_prefix('/').unwrap_or(full_name);
        match full_name.split_once('/') {
            Some((service, method))
                if !service.is_empty() && !method.is_empty() && !method.contains('/') => {}
            _ => {
                return Err(CallError::InvalidArgument(format!(
                    "method name must have the form package.Service/Method, got {:?}",
                    full_name
                )));
            }
        }

        Ok(Self {
            full_name: Arc::from(full_name),
            method_type,
            request: Arc::new(request),
            response: Arc::new(response),
        })
    }

    /// Create a unary method descriptor.
    pub fn unary<M, N>(full_name: &str, request: M, response: N) -> Result<Self, CallError>
    where
        M: Marshaller<Req> + 'static,
        N: Marshaller<Res> + 'static,
    {
        Self::new(full_name, MethodType::Unary, request, response)
    }

    /// Create a client-streaming method descriptor.
    pub fn client_streaming<M, N>(
        full_name: &str,
        request: M,
        response: N,
    ) -> Result<Self, CallError>
    where
        M: Marshaller<Req> + 'static,
        N: Marshaller<Res> + 'static,
    {
        Self::new(full_name, MethodType::ClientStreaming, request, response)
    }
}

impl<Req, Res> MethodDescriptor<Req, Res> {
    /// Get the full method name, e.g. `echo.v1.EchoService/Echo`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Get the service part of the name.
    pub fn service_name(&self) -> &str {
        let name: &str = &self.full_name;
        name.split_once('/').map_or(name, |(service, _)| service)
    }

    /// Get the method part of the name.
    pub fn method_name(&self) -> &str {
        let name: &str = &self.full_name;
        name.split_once('/').map_or(name, |(_, method)| method)
    }

    /// Get the method type.
    pub fn method_type(&self) -> MethodType {
        self.method_type
    }

    pub(crate) fn request_marshaller(&self) -> &Arc<dyn Marshaller<Req>> {
        &self.request
    }

    pub(crate) fn response_marshaller(&self) -> &Arc<dyn Marshaller<Res>> {
        &self.response
    }
}

impl<Req, Res> Clone for MethodDescriptor<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            full_name: self.full_name.clone(),
            method_type: self.method_type,
            request: self.request.clone(),
            response: self.response.clone(),
        }
    }
}

impl<Req, Res> fmt::Debug for MethodDescriptor<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("full_name", &self.full_name)
            .field("method_type", &self.method_type)
            .finish()
    }
}

impl<Req, Res> fmt::Display for MethodDescriptor<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}
