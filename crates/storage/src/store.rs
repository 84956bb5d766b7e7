//! Store: keyed record map whose isolation lives in the lock context
//!
//! # Design Notes
//!
//! - **Lock first**: every mutator calls `ctx.exclusive()` and every reader
//!   `ctx.shared()` before touching the map. Transaction isolation is decided
//!   entirely by the context.
//! - **Coarse-grained**: the context wraps one store-wide lock, so writers of
//!   any key exclude each other and all readers share one pool.
//! - **Eager writes**: mutations apply immediately; there is no undo buffer.
//! - The inner `RwLock` only makes the map sound to share between threads;
//!   under a correctly used context it is never contended.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;
use txmap_core::{DataUnit, Error, Key, LockContext, Result, Storage};

/// In-memory keyed store
#[derive(Debug)]
pub struct Store<V> {
    data: RwLock<FxHashMap<Key, DataUnit<V>>>,
}

impl<V> Store<V> {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            data: RwLock::new(FxHashMap::default()),
        }
    }

    /// Number of records, read under shared mode
    pub fn len(&self, ctx: &dyn LockContext) -> Result<usize> {
        ctx.shared()?;
        Ok(self.data.read().len())
    }

    /// Whether the store is empty, read under shared mode
    pub fn is_empty(&self, ctx: &dyn LockContext) -> Result<bool> {
        Ok(self.len(ctx)? == 0)
    }
}

impl<V> Default for Store<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Storage<V> for Store<V>
where
    V: Clone + Send + Sync,
{
    fn add(&self, data: DataUnit<V>, ctx: &dyn LockContext) -> Result<()> {
        ctx.exclusive()?;
        let key = data.key();
        let mut map = self.data.write();
        if map.contains_key(&key) {
            return Err(Error::KeyConflict(key));
        }
        map.insert(key, data);
        trace!(target: "txmap::store", key, txn_id = %ctx.transaction_id(), "Added");
        Ok(())
    }

    fn update(&self, data: DataUnit<V>, ctx: &dyn LockContext) -> Result<()> {
        ctx.exclusive()?;
        let key = data.key();
        self.data.write().insert(key, data);
        trace!(target: "txmap::store", key, txn_id = %ctx.transaction_id(), "Updated");
        Ok(())
    }

    fn remove(&self, key: Key, ctx: &dyn LockContext) -> Result<()> {
        ctx.exclusive()?;
        match self.data.write().remove(&key) {
            Some(_) => {
                trace!(target: "txmap::store", key, txn_id = %ctx.transaction_id(), "Removed");
                Ok(())
            }
            None => Err(Error::KeyNotFound(key)),
        }
    }

    fn read(&self, key: Key, ctx: &dyn LockContext) -> Result<DataUnit<V>> {
        ctx.shared()?;
        self.data
            .read()
            .get(&key)
            .cloned()
            .ok_or(Error::KeyNotFound(key))
    }

    fn contains(&self, key: Key, ctx: &dyn LockContext) -> Result<bool> {
        ctx.shared()?;
        Ok(self.data.read().contains_key(&key))
    }
}
