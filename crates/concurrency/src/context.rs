//! Per-transaction lock acquisition
//!
//! A TransactionContext binds one transaction to the store-wide
//! [`GenericLock`]. It remembers which mode the transaction already holds so
//! that repeated `shared()`/`exclusive()` calls are no-ops, and it releases
//! everything exactly once when the transaction completes.
//!
//! ## Mode transitions
//!
//! ```text
//! Idle ──shared()──────────────────────► Holding(Shared)
//! Idle ──exclusive()── upgradeable ───► escalate ──► Holding(Exclusive)
//! Holding(Shared) ──exclusive()── exit shared ── upgradeable ── escalate ──► Holding(Exclusive)
//! any ──release()──► Released
//! ```
//!
//! Writers always pass through upgradeable. That reserves the single writer
//! slot first and then waits for readers to drain, so a steady stream of
//! readers cannot keep the writer at `owners == 0` forever, and two writers
//! never hold-and-wait on each other.
//!
//! The read hold is dropped before the switch to upgradeable. Another
//! transaction may write in between.

use crate::generic_lock::{GenericLock, LockMode};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, trace};
use txmap_core::{Error, LockContext, Result, TransactionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Held {
    Idle,
    Holding(LockMode),
    Released,
}

/// Lock context of a single transaction
pub struct TransactionContext {
    txn_id: TransactionId,
    lock: Arc<GenericLock<TransactionId>>,
    held: Mutex<Held>,
}

impl TransactionContext {
    /// Create a context that acquires `lock` on behalf of `txn_id`
    pub fn new(txn_id: TransactionId, lock: Arc<GenericLock<TransactionId>>) -> Self {
        Self {
            txn_id,
            lock,
            held: Mutex::new(Held::Idle),
        }
    }

    /// Strongest mode currently held, if any
    ///
    /// `Exclusive` implies the escalated upgradeable hold underneath it.
    pub fn held_mode(&self) -> Option<LockMode> {
        match *self.held.lock() {
            Held::Holding(mode) => Some(mode),
            Held::Idle | Held::Released => None,
        }
    }

    /// Whether `release` has run
    pub fn is_released(&self) -> bool {
        *self.held.lock() == Held::Released
    }

    /// Release every mode held by this transaction
    ///
    /// Idempotent; later acquisitions fail with `TransactionInactive`.
    pub fn release(&self) -> Result<()> {
        let mut held = self.held.lock();
        let id = &self.txn_id;
        let result = match *held {
            Held::Holding(LockMode::Exclusive) => self
                .lock
                .exit_exclusive(id)
                .and_then(|()| self.lock.exit_upgradeable(id)),
            Held::Holding(LockMode::Upgradeable) => self.lock.exit_upgradeable(id),
            Held::Holding(LockMode::Shared) => self.lock.exit_shared(id),
            Held::Idle | Held::Released => Ok(()),
        };
        *held = Held::Released;
        trace!(target: "txmap::lock", txn_id = %id, "Transaction locks released");
        result
    }

    fn escalate(&self) -> Result<()> {
        self.lock.enter_upgradeable(&self.txn_id)?;
        if let Err(e) = self.lock.enter_exclusive(&self.txn_id) {
            self.abandon_upgradeable();
            return Err(e);
        }
        Ok(())
    }

    // The escalation error is what the caller sees; a failed undo is only logged.
    fn abandon_upgradeable(&self) {
        if let Err(e) = self.lock.exit_upgradeable(&self.txn_id) {
            error!(target: "txmap::lock", txn_id = %self.txn_id, error = %e, "Failed to back out of upgradeable after escalation failed");
        }
    }
}

impl LockContext for TransactionContext {
    fn transaction_id(&self) -> TransactionId {
        self.txn_id
    }

    fn exclusive(&self) -> Result<()> {
        let mut held = self.held.lock();
        match *held {
            Held::Holding(LockMode::Exclusive) => return Ok(()),
            Held::Released => return Err(Error::TransactionInactive(self.txn_id)),
            Held::Holding(LockMode::Shared) => {
                self.lock.exit_shared(&self.txn_id)?;
                *held = Held::Idle;
            }
            Held::Holding(LockMode::Upgradeable) => {
                self.lock.exit_upgradeable(&self.txn_id)?;
                *held = Held::Idle;
            }
            Held::Idle => {}
        }
        self.escalate()?;
        *held = Held::Holding(LockMode::Exclusive);
        trace!(target: "txmap::lock", txn_id = %self.txn_id, "Exclusive acquired");
        Ok(())
    }

    fn shared(&self) -> Result<()> {
        let mut held = self.held.lock();
        match *held {
            Held::Holding(_) => Ok(()),
            Held::Released => Err(Error::TransactionInactive(self.txn_id)),
            Held::Idle => {
                self.lock.enter_shared(&self.txn_id)?;
                *held = Held::Holding(LockMode::Shared);
                trace!(target: "txmap::lock", txn_id = %self.txn_id, "Shared acquired");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("txn_id", &self.txn_id)
            .field("held", &*self.held.lock())
            .finish()
    }
}
