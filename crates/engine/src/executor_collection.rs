//! Transaction → context map
//!
//! `get` lazily creates one [`TransactionContext`] per transaction, enlists a
//! [`TransactionExecutor`] with the transaction and subscribes to its
//! completion. Completion removes the mapping exactly once and releases the
//! transaction's locks, on commit and rollback alike.
//!
//! One coarse mutex guards the map. It is touched on a transaction's first
//! access and at its completion, never per data operation.

use crate::coordinator::{EnlistmentOptions, Transaction, TransactionOutcome};
use crate::executor::TransactionExecutor;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, error};
use txmap_concurrency::{GenericLock, TransactionContext};
use txmap_core::{Result, TransactionId};

type ExecutorMap = Mutex<FxHashMap<TransactionId, Arc<TransactionExecutor>>>;

/// Owns the lock contexts of all live transactions
pub struct ExecutorCollection {
    lock: Arc<GenericLock<TransactionId>>,
    executors: Arc<ExecutorMap>,
}

impl ExecutorCollection {
    /// Create an empty collection whose contexts share `lock`
    pub fn new(lock: Arc<GenericLock<TransactionId>>) -> Self {
        Self::with_capacity(lock, 0)
    }

    /// Create an empty collection with room for `capacity` transactions
    pub fn with_capacity(lock: Arc<GenericLock<TransactionId>>, capacity: usize) -> Self {
        Self {
            lock,
            executors: Arc::new(Mutex::new(FxHashMap::with_capacity_and_hasher(
                capacity,
                Default::default(),
            ))),
        }
    }

    /// Context of `transaction`, created and enlisted on first access
    ///
    /// Repeated calls for the same transaction return the same instance.
    ///
    /// # Errors
    /// Whatever enlistment or completion subscription reports, e.g.
    /// `TransactionInactive` once the transaction is completing.
    pub fn get(&self, transaction: &Transaction) -> Result<Arc<TransactionContext>> {
        let txn_id = transaction.id();
        let mut executors = self.executors.lock();
        if let Some(executor) = executors.get(&txn_id) {
            return Ok(Arc::clone(executor.context()));
        }
        let executor = Arc::new(TransactionExecutor::new(TransactionContext::new(
            txn_id,
            Arc::clone(&self.lock),
        )));
        transaction.enlist_volatile(
            executor.clone(),
            EnlistmentOptions::EnlistDuringPrepareRequired,
        )?;

        let map = Arc::clone(&self.executors);
        transaction.on_completed(Box::new(move |outcome: &TransactionOutcome| {
            remove_executor(&map, outcome)
        }))?;

        executors.insert(txn_id, Arc::clone(&executor));
        debug!(target: "txmap::executor", txn_id = %txn_id, "Context created");
        Ok(Arc::clone(executor.context()))
    }

    /// Whether a context is registered for `txn_id`
    pub fn contains(&self, txn_id: &TransactionId) -> bool {
        self.executors.lock().contains_key(txn_id)
    }

    /// Number of live transactions with a context
    pub fn len(&self) -> usize {
        self.executors.lock().len()
    }

    /// Whether no transaction has a context
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store-wide lock shared by every context
    pub fn lock(&self) -> &Arc<GenericLock<TransactionId>> {
        &self.lock
    }
}

impl std::fmt::Debug for ExecutorCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorCollection")
            .field("live", &self.len())
            .finish()
    }
}

/// Completion handler: drop the mapping, then release the locks
///
/// # Panics
/// If no mapping exists. That means completion fired twice or the mapping
/// was removed early, an internal lifecycle bug.
fn remove_executor(executors: &ExecutorMap, outcome: &TransactionOutcome) {
    let removed = executors.lock().remove(&outcome.txn_id);
    let Some(executor) = removed else {
        panic!(
            "no executor registered for transaction {}: completion delivered twice or mapping removed early",
            outcome.txn_id
        );
    };
    if let Err(e) = executor.context().release() {
        error!(target: "txmap::executor", txn_id = %outcome.txn_id, error = %e, "Failed to release transaction locks");
    }
    debug!(target: "txmap::executor", txn_id = %outcome.txn_id, status = %outcome.status, "Context removed");
}
