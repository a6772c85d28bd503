//! Synchronous error types for the call layer.
//!
//! Failures reported by a transport travel asynchronously through the
//! returned future or observer (see [`TransportError`](crate::TransportError)
//! and [`ApiError`](crate::ApiError)). The types here cover misuse that is
//! detected before any transport call is issued:
//!
//! - [`CallError`]: invalid arguments and missing configuration
//! - [`SinkError`]: pushing into a client-streaming request sink that no
//!   longer accepts messages

use rpc_callable_core::Code;

/// Error returned synchronously when a call cannot be started.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    /// An argument supplied to a constructor or an invocation is invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The resolved call context lacks something the call needs, such as a
    /// transport channel.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CallError {
    /// Get the status code that best describes this error.
    ///
    /// - InvalidArgument: `InvalidArgument`
    /// - Configuration: `FailedPrecondition`
    pub fn code(&self) -> Code {
        match self {
            CallError::InvalidArgument(_) => Code::InvalidArgument,
            CallError::Configuration(_) => Code::FailedPrecondition,
        }
    }
}

/// Error returned when pushing into a [`RequestSink`](crate::RequestSink).
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The sink was already completed or cancelled by the caller.
    #[error("request stream is already closed")]
    Closed,

    /// The call ended and the transport stopped reading requests.
    #[error("call is no longer accepting requests")]
    Disconnected,
}

impl SinkError {
    /// Get the status code that best describes this error.
    pub fn code(&self) -> Code {
        match self {
            SinkError::Closed => Code::FailedPrecondition,
            SinkError::Disconnected => Code::Canceled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_error_codes() {
        assert_eq!(
            CallError::InvalidArgument("x".into()).code(),
            Code::InvalidArgument
        );
        assert_eq!(
            CallError::Configuration("x".into()).code(),
            Code::FailedPrecondition
        );
    }

    #[test]
    fn test_call_error_display() {
        let err = CallError::Configuration("no transport channel".into());
        assert_eq!(err.to_string(), "configuration error: no transport channel");
    }

    #[test]
    fn test_sink_error_codes() {
        assert_eq!(SinkError::Closed.code(), Code::FailedPrecondition);
        assert_eq!(SinkError::Disconnected.code(), Code::Canceled);
        assert_eq!(SinkError::Closed.to_string(), "request stream is already closed");
    }
}
