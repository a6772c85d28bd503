//! Per-call configuration.
//!
//! [`CallContext`] is an immutable value holding everything a single
//! invocation needs besides its request: credentials, the transport channel,
//! a timeout, request metadata and transport-specific extensions.
//!
//! Every field distinguishes "unset" from "set", which is what makes
//! [`merge`](CallContext::merge) well defined: only fields that are set in the
//! overriding context replace the receiver's values.
//!
//! # Example
//!
//! ```ignore
//! use rpc_callable::CallContext;
//! use std::time::Duration;
//!
//! let defaults = CallContext::new()
//!     .with_transport_channel(channel)
//!     .with_timeout(Duration::from_secs(30));
//!
//! // Per-call override: only the timeout changes.
//! let context = defaults.merge(&CallContext::new().with_timeout(Duration::from_secs(5)));
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::{Extensions, HeaderMap};

use crate::options::CallOptions;
use crate::transport::TransportChannel;

/// An opaque credential handle.
///
/// The call layer never inspects credentials; it only carries them to the
/// transport, which may recover the concrete type with
/// [`downcast_ref`](Credentials::downcast_ref).
#[derive(Clone)]
pub struct Credentials {
    inner: Arc<dyn Any + Send + Sync>,
}

impl Credentials {
    /// Wrap a transport-specific credential value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Borrow the credential value as `T`, if that is its type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    /// Returns whether both handles refer to the same credential instance.
    pub fn same_credentials(&self, other: &Credentials) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(..)")
    }
}

/// Immutable configuration for one RPC invocation.
///
/// Every `with_*` method returns a new context and leaves the receiver
/// untouched, so a client can keep one default context and derive per-call
/// contexts from it concurrently.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    credentials: Option<Credentials>,
    channel: Option<TransportChannel>,
    timeout: Option<Duration>,
    metadata: Option<HeaderMap>,
    extensions: Extensions,
}

impl CallContext {
    /// Create a context with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new context with the given credentials set.
    pub fn with_credentials(&self, credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
            ..self.clone()
        }
    }

    /// Returns a new context with the given transport channel set.
    pub fn with_transport_channel(&self, channel: TransportChannel) -> Self {
        Self {
            channel: Some(channel),
            ..self.clone()
        }
    }

    /// Returns a new context with the given timeout set.
    ///
    /// The timeout applies to a single transport call. Outer decorators that
    /// issue several calls (retries, paging) take correspondingly longer.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self.clone()
        }
    }

    /// Returns a new context with the given request metadata set.
    ///
    /// The map replaces any metadata previously set; it is not merged
    /// header by header.
    pub fn with_metadata(&self, metadata: HeaderMap) -> Self {
        Self {
            metadata: Some(metadata),
            ..self.clone()
        }
    }

    /// Returns a new context with a transport-specific extension set.
    ///
    /// Extensions are keyed by type; setting a value of a type that is
    /// already present replaces it.
    pub fn with_extension<T>(&self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut extensions = self.extensions.clone();
        extensions.insert(value);
        Self {
            extensions,
            ..self.clone()
        }
    }

    /// If `context` is present, returns a copy of it; otherwise returns a
    /// copy of `self`.
    ///
    /// Lets call sites accept an optional caller-supplied context and fall
    /// back to a component default without branching.
    pub fn null_to_self(&self, context: Option<&CallContext>) -> CallContext {
        context.unwrap_or(self).clone()
    }

    /// Returns a new context where every field set in `other` overrides the
    /// corresponding field of `self`.
    ///
    /// Fields left unset in `other` keep the value from `self`. Extensions are
    /// merged per type, with `other` winning.
    pub fn merge(&self, other: &CallContext) -> CallContext {
        let mut extensions = self.extensions.clone();
        extensions.extend(other.extensions.clone());

        CallContext {
            credentials: other
                .credentials
                .clone()
                .or_else(|| self.credentials.clone()),
            channel: other.channel.clone().or_else(|| self.channel.clone()),
            timeout: other.timeout.or(self.timeout),
            metadata: other.metadata.clone().or_else(|| self.metadata.clone()),
            extensions,
        }
    }

    /// Get the credentials, if set.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Get the transport channel, if set.
    pub fn transport_channel(&self) -> Option<&TransportChannel> {
        self.channel.as_ref()
    }

    /// Get the timeout, if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Get the request metadata, if set.
    pub fn metadata(&self) -> Option<&HeaderMap> {
        self.metadata.as_ref()
    }

    /// Get a transport-specific extension by type.
    pub fn extension<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.extensions.get::<T>()
    }

    /// Build the options handed to the transport for a call made with this
    /// context.
    pub fn call_options(&self) -> CallOptions {
        CallOptions {
            timeout: self.timeout,
            headers: self.metadata.clone().unwrap_or_default(),
            credentials: self.credentials.clone(),
            extensions: self.extensions.clone(),
        }
    }
}
