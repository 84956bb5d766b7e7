//! Core traits for lock contexts and storage
//!
//! These traits let the store stay ignorant of how isolation is achieved:
//! it asks a [`LockContext`] for the right mode and then touches its map.

use crate::error::Result;
use crate::types::{DataUnit, Key, TransactionId};

/// Per-transaction lock acquisition context
///
/// Both methods are idempotent for the lifetime of one transaction: once a
/// mode is held, asking for it again (or for a weaker one) is a no-op.
/// Implementations may block the calling thread.
pub trait LockContext: Send + Sync {
    /// Transaction this context acquires locks for
    fn transaction_id(&self) -> TransactionId;

    /// Ensure the transaction holds write access
    fn exclusive(&self) -> Result<()>;

    /// Ensure the transaction holds at least read access
    fn shared(&self) -> Result<()>;
}

/// Keyed storage whose isolation is delegated to a [`LockContext`]
///
/// Every mutator must call `ctx.exclusive()` and every reader `ctx.shared()`
/// before touching the underlying map.
pub trait Storage<V>: Send + Sync {
    /// Insert a new record
    ///
    /// # Errors
    /// `KeyConflict` if the key is already present; the map is unchanged.
    fn add(&self, data: DataUnit<V>, ctx: &dyn LockContext) -> Result<()>;

    /// Insert or replace a record
    fn update(&self, data: DataUnit<V>, ctx: &dyn LockContext) -> Result<()>;

    /// Remove a record by key
    ///
    /// # Errors
    /// `KeyNotFound` if the key is absent; the map is unchanged.
    fn remove(&self, key: Key, ctx: &dyn LockContext) -> Result<()>;

    /// Read a record by key
    ///
    /// # Errors
    /// `KeyNotFound` if the key is absent.
    fn read(&self, key: Key, ctx: &dyn LockContext) -> Result<DataUnit<V>>;

    /// Whether a record with this key exists
    fn contains(&self, key: Key, ctx: &dyn LockContext) -> Result<bool>;
}
