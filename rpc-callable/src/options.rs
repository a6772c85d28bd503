//! Call options handed to the transport.
//!
//! [`CallOptions`] is the transport-facing view of a resolved
//! [`CallContext`](crate::CallContext): it carries the timeout, request
//! metadata, credentials and transport-specific extensions for one call.

use std::time::{Duration, Instant};

use http::{Extensions, HeaderMap};

use crate::context::Credentials;

/// Options for one transport call.
///
/// Usually produced by [`CallContext::call_options`](crate::CallContext::call_options);
/// transports read it and never hand it back.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub(crate) timeout: Option<Duration>,
    pub(crate) headers: HeaderMap,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) extensions: Extensions,
}

impl CallOptions {
    /// Create empty call options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the per-call timeout, if any.
    ///
    /// The call layer does not enforce it; transports map it onto their own
    /// deadline mechanism.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Compute the absolute deadline for a call starting at `start`.
    ///
    /// Returns `None` if no timeout is set or the deadline does not fit in an
    /// [`Instant`].
    pub fn deadline_from(&self, start: Instant) -> Option<Instant> {
        self.timeout.and_then(|timeout| start.checked_add(timeout))
    }

    /// Get the request metadata.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the credentials attached to the call.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Get the transport-specific extensions.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }
}
