//! Error types for txmap
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! A completion notification for a transaction with no registered context is
//! not represented here: it is an internal invariant breach and panics.

use crate::types::{Key, TransactionId};
use std::io;
use thiserror::Error;

/// Result type alias for txmap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for txmap
#[derive(Debug, Error)]
pub enum Error {
    /// Programmer error against the lock or transaction protocol: recursive
    /// acquisition, cross-mode entry, release of a mode not held
    #[error("Usage violation in {operation}: {reason}")]
    UsageViolation {
        /// Operation that was rejected
        operation: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Add with a key that is already present
    #[error("Key already exists: {0}")]
    KeyConflict(Key),

    /// Remove or read of an absent key
    #[error("Key not found: {0}")]
    KeyNotFound(Key),

    /// The transaction has already completed
    #[error("Transaction {0} is no longer active")]
    TransactionInactive(TransactionId),

    /// A participant voted to roll the transaction back
    #[error("Transaction {0} aborted")]
    TransactionAborted(TransactionId),

    /// A participant never acknowledged its prepare vote
    #[error("Transaction {0} outcome is in doubt")]
    TransactionInDoubt(TransactionId),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error while loading configuration
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Construct a usage violation
    pub fn usage(operation: &'static str, reason: impl Into<String>) -> Self {
        Error::UsageViolation {
            operation,
            reason: reason.into(),
        }
    }

    /// True for programmer errors against the lock/transaction protocol
    pub fn is_usage_violation(&self) -> bool {
        matches!(self, Error::UsageViolation { .. })
    }
}
