//! Call settings.
//!
//! [`CallSettings`] collects the per-method configuration applied when a call
//! chain is assembled by [`Callables`](crate::Callables):
//!
//! - which status codes the exception layer marks as retryable
//! - a default timeout for calls made through a
//!   [`ClientCallable`](crate::ClientCallable)
//!
//! # Example
//!
//! ```ignore
//! use rpc_callable::{CallSettings, Code};
//! use std::time::Duration;
//!
//! let settings = CallSettings::new()
//!     .retryable_codes([Code::Unavailable, Code::DeadlineExceeded])
//!     .timeout(Duration::from_secs(10));
//! ```

use std::collections::HashSet;
use std::time::Duration;

use rpc_callable_core::Code;

use crate::context::CallContext;
use crate::error::CallError;
use crate::exception::ApiExceptionFactory;

/// Default configuration values.
pub mod defaults {
    use rpc_callable_core::Code;

    /// Codes marked retryable unless configured otherwise.
    pub const RETRYABLE_CODES: [Code; 3] =
        [Code::Unavailable, Code::ResourceExhausted, Code::Aborted];
}

/// Configuration for one method's call chain.
///
/// # Default Values
///
/// - `retryable_codes`: `Unavailable`, `ResourceExhausted`, `Aborted`
/// - `timeout`: none
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallSettings {
    /// Codes the exception layer marks as retryable.
    pub retryable_codes: HashSet<Code>,

    /// Timeout applied to the client's default context.
    pub timeout: Option<Duration>,
}

impl Default for CallSettings {
    fn default() -> Self {
        Self {
            retryable_codes: defaults::RETRYABLE_CODES.into_iter().collect(),
            timeout: None,
        }
    }
}

impl CallSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set of retryable codes.
    pub fn retryable_codes<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = Code>,
    {
        self.retryable_codes = codes.into_iter().collect();
        self
    }

    /// Add one code to the retryable set.
    pub fn retryable_code(mut self, code: Code) -> Self {
        self.retryable_codes.insert(code);
        self
    }

    /// Set the default timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), CallError> {
        if self.timeout == Some(Duration::ZERO) {
            return Err(CallError::InvalidArgument(
                "timeout must be greater than zero".into(),
            ));
        }
        if self.retryable_codes.contains(&Code::Ok) {
            return Err(CallError::InvalidArgument(
                "ok cannot be a retryable code".into(),
            ));
        }
        Ok(())
    }

    /// Build the exception factory for these settings.
    pub fn exception_factory(&self) -> ApiExceptionFactory {
        ApiExceptionFactory::new(self.retryable_codes.iter().copied())
    }

    /// Apply these settings to a context.
    ///
    /// A timeout already set on `context` is kept.
    pub fn apply(&self, context: &CallContext) -> CallContext {
        match self.timeout {
            Some(timeout) => CallContext::new().with_timeout(timeout).merge(context),
            None => context.clone(),
        }
    }
}
