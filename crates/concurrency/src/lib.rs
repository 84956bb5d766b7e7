//! Concurrency layer for txmap
//!
//! This crate implements pessimistic, transaction-scoped locking:
//! - LockState: packed owner counter with an exclusive bit
//! - GenericLock: shared / upgradeable / exclusive lock keyed by owner id
//! - TransactionContext: binds one transaction to the store-wide lock

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod generic_lock;
pub mod lock_state;

pub use context::TransactionContext;
pub use generic_lock::{GenericLock, LockMode, DEFAULT_BACKOFF};
pub use lock_state::{LockState, MAX_SHARED};
