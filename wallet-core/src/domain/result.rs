//! Result and error types for the core library

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// Every failure a caller can observe maps to exactly one [`ErrorKind`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Sender not found: {0}")]
    SenderNotFound(String),

    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Username or email already exists")]
    UsernameOrEmailTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not found: {0}")]
    NotFound(String),

    /// A version check failed because the account changed after it was read
    #[error("Concurrent modification: {0}")]
    Conflict(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable, serializable classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    SenderNotFound,
    RecipientNotFound,
    InsufficientFunds,
    UsernameOrEmailTaken,
    InvalidCredentials,
    NotFound,
    Conflict,
    PersistenceFailure,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::SenderNotFound => "sender_not_found",
            ErrorKind::RecipientNotFound => "recipient_not_found",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::UsernameOrEmailTaken => "username_or_email_taken",
            ErrorKind::InvalidCredentials => "invalid_credentials",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::PersistenceFailure => "persistence_failure",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Create an invalid request error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::SenderNotFound(_) => ErrorKind::SenderNotFound,
            Error::RecipientNotFound(_) => ErrorKind::RecipientNotFound,
            Error::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Error::UsernameOrEmailTaken => ErrorKind::UsernameOrEmailTaken,
            Error::InvalidCredentials => ErrorKind::InvalidCredentials,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Persistence(_) => ErrorKind::PersistenceFailure,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether repeating the whole operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_) | Error::Persistence(_))
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result for JSON callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
        }
    }

    /// Create a failed result from a core error
    pub fn fail(error: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_operation_result_ok() {
        let result: OperationResult<i32> = OperationResult::ok(42);
        assert!(result.success);
        assert_eq!(result.data, Some(42));
        assert!(result.error.is_none());
        assert!(result.error_kind.is_none());
    }

    #[test]
    fn test_operation_result_fail_carries_kind() {
        let err = Error::InsufficientFunds {
            requested: dec!(100),
            available: dec!(50),
        };
        let result: OperationResult<i32> = OperationResult::fail(&err);
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::InsufficientFunds));
        assert!(result.error.unwrap().contains("Insufficient balance"));
    }

    #[test]
    fn test_from_result() {
        let err: Result<i32> = Err(Error::invalid("amount must be positive"));
        let result: OperationResult<i32> = err.into();
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::InvalidRequest));
        assert!(result.error.unwrap().contains("Invalid request"));
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(Error::Conflict("stale".into()).is_retryable());
        assert!(Error::persistence("disk full").is_retryable());
        assert!(!Error::InvalidCredentials.is_retryable());
        assert!(!Error::SenderNotFound("ghost".into()).is_retryable());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::PersistenceFailure).unwrap();
        assert_eq!(json, "\"persistence_failure\"");
        assert_eq!(Error::UsernameOrEmailTaken.kind().as_str(), "username_or_email_taken");
    }
}
