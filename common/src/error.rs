//! Error taxonomy for Custodia ledger operations.
//!
//! Every failure an engine operation can surface is one of these kinds.
//! Business-rule rejections are terminal; only `Busy` and `Storage` are
//! worth retrying, and a retry is always safe because a failed operation
//! leaves no partial effects behind.

use crate::UserId;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Main error type for Custodia ledger operations.
#[derive(Error, Debug)]
pub enum CustodiaError {
    /// Malformed or contradictory input.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        message: String,
        field: Option<String>,
    },

    /// No account exists for the user.
    #[error("No account for user: {0}")]
    NotFound(UserId),

    /// An account already exists for the user.
    #[error("Account already exists for user: {0}")]
    AlreadyExists(UserId),

    /// The account is frozen and cannot take part in transfers.
    #[error("Account frozen: {0}")]
    AccountFrozen(UserId),

    /// The source account cannot cover the requested amount.
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    /// An account row lock could not be acquired within the bounded wait.
    #[error("Busy: account rows contended during {operation}")]
    Busy { operation: String },

    /// The journal or backing store rejected the write.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CustodiaError {
    /// Invalid argument without a field attribution.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        CustodiaError::InvalidArgument {
            message: message.into(),
            field: None,
        }
    }

    /// Invalid argument pinned to one input field.
    pub fn invalid_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        CustodiaError::InvalidArgument {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Check if this error is retryable.
    ///
    /// Retryable kinds mean the operation had no effect for operational
    /// reasons; resubmitting the same intent is safe. Everything else
    /// requires the caller to change the request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CustodiaError::Busy { .. } | CustodiaError::Storage(_)
        )
    }

    /// Stable code for the presentation layer.
    pub fn error_code(&self) -> &'static str {
        match self {
            CustodiaError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            CustodiaError::NotFound(_) => "NOT_FOUND",
            CustodiaError::AlreadyExists(_) => "ALREADY_EXISTS",
            CustodiaError::AccountFrozen(_) => "ACCOUNT_FROZEN",
            CustodiaError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            CustodiaError::Busy { .. } => "BUSY",
            CustodiaError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Actionable message safe to show an operator.
    /// Storage detail never passes through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            CustodiaError::InvalidArgument { message, .. } => message.clone(),
            CustodiaError::NotFound(user) => {
                format!("No account exists for user {user}")
            }
            CustodiaError::AlreadyExists(user) => {
                format!("An account already exists for user {user}")
            }
            CustodiaError::AccountFrozen(user) => {
                format!("Account {user} is frozen and cannot take part in transfers")
            }
            CustodiaError::InsufficientFunds {
                requested,
                available,
            } => format!(
                "Insufficient funds: the source account holds {available}, the operation needs {requested}"
            ),
            CustodiaError::Busy { operation } => format!(
                "The account is busy with another operation; retry the {operation}"
            ),
            CustodiaError::Storage(_) => {
                "A storage fault interrupted the operation before anything was committed; retry the request".to_string()
            }
        }
    }

    /// Structured form for the presentation boundary.
    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            code: self.error_code(),
            message: self.user_message(),
            field: match self {
                CustodiaError::InvalidArgument { field, .. } => field.clone(),
                _ => None,
            },
            retryable: self.is_retryable(),
        }
    }
}

/// Result type alias for Custodia ledger operations.
pub type Result<T> = std::result::Result<T, CustodiaError>;

/// Serializable error surface handed to the console UI.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    /// Stable error code.
    pub code: &'static str,
    /// Human-readable, operator-safe message.
    pub message: String,
    /// Input field that caused the rejection (if applicable).
    pub field: Option<String>,
    /// Whether resubmitting the same request can succeed.
    pub retryable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_retryable_split() {
        assert!(CustodiaError::Busy {
            operation: "transfer".into()
        }
        .is_retryable());
        assert!(CustodiaError::Storage("journal full".into()).is_retryable());

        assert!(!CustodiaError::NotFound(UserId::new("alice")).is_retryable());
        assert!(!CustodiaError::AccountFrozen(UserId::new("bob")).is_retryable());
        assert!(!CustodiaError::InsufficientFunds {
            requested: Decimal::from_str("50.00").unwrap(),
            available: Decimal::from_str("10.00").unwrap(),
        }
        .is_retryable());
        assert!(!CustodiaError::invalid_argument("negative amount").is_retryable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            CustodiaError::invalid_field("bad amount", "amount").error_code(),
            "INVALID_ARGUMENT"
        );
        assert_eq!(
            CustodiaError::NotFound(UserId::new("ghost")).error_code(),
            "NOT_FOUND"
        );
        assert_eq!(
            CustodiaError::Storage("disk".into()).error_code(),
            "STORAGE_ERROR"
        );
    }

    #[test]
    fn test_storage_detail_not_surfaced() {
        let err = CustodiaError::Storage("page 0x7f corrupt at offset 4096".into());
        assert!(!err.user_message().contains("0x7f"));
        assert!(err.detail().retryable);
    }

    #[test]
    fn test_detail_carries_field() {
        let err = CustodiaError::invalid_field("amount must be positive", "amount");
        let detail = err.detail();
        assert_eq!(detail.code, "INVALID_ARGUMENT");
        assert_eq!(detail.field.as_deref(), Some("amount"));
        assert!(!detail.retryable);
    }
}
