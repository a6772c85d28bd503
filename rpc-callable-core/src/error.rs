//! RPC status codes and status values.
//!
//! This module provides the core error types used by the call layer:
//! - [`Code`]: Fixed enumeration of RPC status codes
//! - [`Status`]: A code paired with an optional human-readable message

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// RPC status codes, numbered as on the gRPC wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    Ok = 0,
    Canceled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl Code {
    /// Every code, in numeric order.
    pub const ALL: [Code; 17] = [
        Code::Ok,
        Code::Canceled,
        Code::Unknown,
        Code::InvalidArgument,
        Code::DeadlineExceeded,
        Code::NotFound,
        Code::AlreadyExists,
        Code::PermissionDenied,
        Code::ResourceExhausted,
        Code::FailedPrecondition,
        Code::Aborted,
        Code::OutOfRange,
        Code::Unimplemented,
        Code::Internal,
        Code::Unavailable,
        Code::DataLoss,
        Code::Unauthenticated,
    ];

    /// Get the string representation of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Ok => "ok",
            Code::Canceled => "canceled",
            Code::Unknown => "unknown",
            Code::InvalidArgument => "invalid_argument",
            Code::DeadlineExceeded => "deadline_exceeded",
            Code::NotFound => "not_found",
            Code::AlreadyExists => "already_exists",
            Code::PermissionDenied => "permission_denied",
            Code::ResourceExhausted => "resource_exhausted",
            Code::FailedPrecondition => "failed_precondition",
            Code::Aborted => "aborted",
            Code::OutOfRange => "out_of_range",
            Code::Unimplemented => "unimplemented",
            Code::Internal => "internal",
            Code::Unavailable => "unavailable",
            Code::DataLoss => "data_loss",
            Code::Unauthenticated => "unauthenticated",
        }
    }

    /// Map a numeric wire value to a code.
    ///
    /// Returns `None` for values outside `0..=16`, so callers can decide how
    /// to treat statuses they do not recognize.
    ///
    /// ```
    /// use rpc_callable_core::Code;
    ///
    /// assert_eq!(Code::from_i32(14), Some(Code::Unavailable));
    /// assert_eq!(Code::from_i32(42), None);
    /// ```
    pub fn from_i32(value: i32) -> Option<Code> {
        usize::try_from(value)
            .ok()
            .and_then(|index| Code::ALL.get(index))
            .copied()
    }

    /// Returns whether this code is in the conventional set of transient
    /// conditions.
    ///
    /// The following codes are considered retryable:
    /// - [`Unavailable`](Code::Unavailable): Service is temporarily unavailable
    /// - [`ResourceExhausted`](Code::ResourceExhausted): Rate limited or quota exceeded
    /// - [`Aborted`](Code::Aborted): Transaction aborted, can be retried
    ///
    /// This is only the default classification. The call layer tags errors
    /// using the retryable set configured for each callable.
    ///
    /// ```
    /// use rpc_callable_core::Code;
    ///
    /// assert!(Code::Unavailable.is_retryable());
    /// assert!(!Code::NotFound.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Code::Unavailable | Code::ResourceExhausted | Code::Aborted
        )
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`Code`] from a string fails.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown status code: {0:?}")]
pub struct ParseCodeError(String);

impl FromStr for Code {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Code::Ok),
            "canceled" | "cancelled" => Ok(Code::Canceled),
            "unknown" => Ok(Code::Unknown),
            "invalid_argument" => Ok(Code::InvalidArgument),
            "deadline_exceeded" => Ok(Code::DeadlineExceeded),
            "not_found" => Ok(Code::NotFound),
            "already_exists" => Ok(Code::AlreadyExists),
            "permission_denied" => Ok(Code::PermissionDenied),
            "resource_exhausted" => Ok(Code::ResourceExhausted),
            "failed_precondition" => Ok(Code::FailedPrecondition),
            "aborted" => Ok(Code::Aborted),
            "out_of_range" => Ok(Code::OutOfRange),
            "unimplemented" => Ok(Code::Unimplemented),
            "internal" => Ok(Code::Internal),
            "unavailable" => Ok(Code::Unavailable),
            "data_loss" => Ok(Code::DataLoss),
            "unauthenticated" => Ok(Code::Unauthenticated),
            other => Err(ParseCodeError(other.to_owned())),
        }
    }
}

/// RPC status: a [`Code`] and an optional message.
///
/// # Example
///
/// ```
/// use rpc_callable_core::{Code, Status};
///
/// let status = Status::not_found("user not found");
/// assert_eq!(status.code(), Code::NotFound);
/// assert_eq!(status.message(), Some("user not found"));
/// assert_eq!(status.to_string(), "not_found: user not found");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    code: Code,
    message: Option<String>,
}

impl Status {
    /// Create a new status with a code and message.
    pub fn new<S: Into<String>>(code: Code, message: S) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    /// Create a new status with just a code.
    pub fn from_code(code: Code) -> Self {
        Self {
            code,
            message: None,
        }
    }

    /// Get the status code.
    pub fn code(&self) -> Code {
        self.code
    }

    /// Get the status message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Convenience wrapper for [`Code::is_retryable()`].
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Create a canceled status.
    pub fn cancelled<S: Into<String>>(message: S) -> Self {
        Self::new(Code::Canceled, message)
    }

    /// Create an unknown status.
    pub fn unknown<S: Into<String>>(message: S) -> Self {
        Self::new(Code::Unknown, message)
    }

    /// Create an invalid argument status.
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    /// Create a deadline exceeded status.
    pub fn deadline_exceeded<S: Into<String>>(message: S) -> Self {
        Self::new(Code::DeadlineExceeded, message)
    }

    /// Create a not found status.
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(Code::NotFound, message)
    }

    /// Create a failed precondition status.
    pub fn failed_precondition<S: Into<String>>(message: S) -> Self {
        Self::new(Code::FailedPrecondition, message)
    }

    /// Create an internal status.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(Code::Internal, message)
    }

    /// Create an unavailable status.
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::new(Code::Unavailable, message)
    }

    /// Create an unauthenticated status.
    pub fn unauthenticated<S: Into<String>>(message: S) -> Self {
        Self::new(Code::Unauthenticated, message)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code.as_str())?;
        if let Some(msg) = &self.message {
            write!(f, ": {}", msg)?;
        }
        Ok(())
    }
}

impl std::error::Error for Status {}

/// JSON shape of a serialized status.
#[derive(Serialize)]
struct StatusBody<'a> {
    code: Code,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl Serialize for Status {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        StatusBody {
            code: self.code,
            message: self.message.as_deref(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_as_str() {
        assert_eq!(Code::Ok.as_str(), "ok");
        assert_eq!(Code::InvalidArgument.as_str(), "invalid_argument");
        assert_eq!(Code::Unauthenticated.as_str(), "unauthenticated");
    }

    #[test]
    fn test_code_from_str() {
        assert_eq!("ok".parse(), Ok(Code::Ok));
        assert_eq!("invalid_argument".parse(), Ok(Code::InvalidArgument));
        assert_eq!("canceled".parse(), Ok(Code::Canceled));
        assert_eq!("cancelled".parse(), Ok(Code::Canceled));
        assert_eq!(
            "unknown_code".parse::<Code>(),
            Err(ParseCodeError("unknown_code".into()))
        );
    }

    #[test]
    fn test_code_from_i32_matches_discriminants() {
        for code in Code::ALL {
            assert_eq!(Code::from_i32(code as i32), Some(code));
        }
        assert_eq!(Code::from_i32(-1), None);
        assert_eq!(Code::from_i32(17), None);
    }

    #[test]
    fn test_code_as_str_round_trips_through_from_str() {
        for code in Code::ALL {
            assert_eq!(code.as_str().parse::<Code>(), Ok(code));
        }
    }

    #[test]
    fn test_code_is_retryable() {
        let retryable: Vec<Code> = Code::ALL.into_iter().filter(Code::is_retryable).collect();
        assert_eq!(
            retryable,
            vec![Code::ResourceExhausted, Code::Aborted, Code::Unavailable]
        );
    }

    #[test]
    fn test_code_serialize() {
        let json = serde_json::to_string(&Code::DeadlineExceeded).unwrap();
        assert_eq!(json, "\"deadline_exceeded\"");
    }

    #[test]
    fn test_status_new() {
        let status = Status::new(Code::NotFound, "resource not found");
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), Some("resource not found"));
    }

    #[test]
    fn test_status_from_code() {
        let status = Status::from_code(Code::Internal);
        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().is_none());
    }

    #[test]
    fn test_status_convenience_constructors() {
        assert_eq!(Status::cancelled("msg").code(), Code::Canceled);
        assert_eq!(Status::unknown("msg").code(), Code::Unknown);
        assert_eq!(Status::invalid_argument("msg").code(), Code::InvalidArgument);
        assert_eq!(Status::deadline_exceeded("msg").code(), Code::DeadlineExceeded);
        assert_eq!(Status::not_found("msg").code(), Code::NotFound);
        assert_eq!(Status::failed_precondition("msg").code(), Code::FailedPrecondition);
        assert_eq!(Status::internal("msg").code(), Code::Internal);
        assert_eq!(Status::unavailable("msg").code(), Code::Unavailable);
        assert_eq!(Status::unauthenticated("msg").code(), Code::Unauthenticated);
    }

    #[test]
    fn test_status_display() {
        let status = Status::not_found("resource missing");
        assert_eq!(status.to_string(), "not_found: resource missing");

        let status = Status::from_code(Code::Internal);
        assert_eq!(status.to_string(), "internal");
    }

    #[test]
    fn test_status_serialize() {
        let json = serde_json::to_string(&Status::unavailable("try later")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["code"], "unavailable");
        assert_eq!(parsed["message"], "try later");

        let json = serde_json::to_string(&Status::from_code(Code::Aborted)).unwrap();
        assert_eq!(json, r#"{"code":"aborted"}"#);
    }
}
