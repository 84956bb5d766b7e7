//! Core types and traits for txmap
//!
//! This crate defines the foundational types used throughout the system:
//! - TransactionId: Unique identifier for transactions and lock owners
//! - DataUnit: Key plus opaque payload
//! - Error: Error type hierarchy
//! - Traits: LockContext and Storage

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{LockContext, Storage};
pub use types::{DataUnit, Key, TransactionId};
