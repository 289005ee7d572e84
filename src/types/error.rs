//! Error types for the wallet ledger
//!
//! This module defines all error types that can occur while moving money
//! through the ledger or mirroring it to storage.
//!
//! # Error Categories
//!
//! - **Balance Errors**: Charge or withdrawal exceeds the available balance
//! - **Validation Errors**: Empty identities, non-positive amounts, malformed listings
//! - **Contention Errors**: Another operation already holds the required lock key
//! - **Storage Errors**: Persistence adapter failures and malformed stored values
//!
//! Purchases, subscriptions and tips surface these as a `false` result.
//! Withdrawals and custom-request payments return them to the caller.

use super::order::RequestStatus;
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the wallet ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// The charge exceeds the funds available to the account
    ///
    /// No balance is mutated when this is returned.
    #[error("Insufficient balance for {account}: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Username (or admin alias) whose balance was checked
        account: String,
        /// Balance at the time of the check
        available: Decimal,
        /// Amount the operation needed
        requested: Decimal,
    },

    /// Empty identity, non-positive amount, or malformed listing/order
    #[error("Invalid parameters: {reason}")]
    InvalidParameters {
        /// Description of the rejected input
        reason: String,
    },

    /// Another invocation already holds the lock key
    ///
    /// The ledger never queues; the caller may retry once the holder finishes.
    #[error("Transaction in progress: lock '{key}' is already held")]
    LockContention {
        /// The contended lock key
        key: String,
    },

    /// The custom request is not in a payable state
    #[error("Custom request {request} cannot be paid while {status}")]
    RequestNotPayable {
        /// Custom request id
        request: String,
        /// Current status of the request
        status: RequestStatus,
    },

    /// A balance update would overflow the decimal range
    #[error("Arithmetic overflow in {operation} for {account}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Affected account
        account: String,
    },

    /// The persistence adapter failed to read or write
    #[error("Persistence error: {message}")]
    Persistence {
        /// Description of the storage failure
        message: String,
    },

    /// A stored value could not be encoded or decoded
    #[error("Serialization error for key '{key}': {message}")]
    Serialization {
        /// Storage key holding the value
        key: String,
        /// Description of the encoding failure
        message: String,
    },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::Persistence {
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create an InsufficientBalance error
    pub fn insufficient_balance(account: &str, available: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientBalance {
            account: account.to_string(),
            available,
            requested,
        }
    }

    /// Create an InvalidParameters error
    pub fn invalid_parameters(reason: impl Into<String>) -> Self {
        LedgerError::InvalidParameters {
            reason: reason.into(),
        }
    }

    /// Create a LockContention error
    pub fn lock_contention(key: impl Into<String>) -> Self {
        LedgerError::LockContention { key: key.into() }
    }

    /// Create a RequestNotPayable error
    pub fn request_not_payable(request: &str, status: RequestStatus) -> Self {
        LedgerError::RequestNotPayable {
            request: request.to_string(),
            status,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: &str) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account: account.to_string(),
        }
    }

    /// Create a Serialization error
    pub fn serialization(key: &str, message: impl ToString) -> Self {
        LedgerError::Serialization {
            key: key.to_string(),
            message: message.to_string(),
        }
    }
}
