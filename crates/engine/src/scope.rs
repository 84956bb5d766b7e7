//! Ambient transaction scopes
//!
//! A [`TransactionScope`] with "required" semantics reuses the calling
//! thread's current transaction if one is installed, otherwise it begins a
//! new one and installs it for the scope's lifetime.
//!
//! Only the scope that began the transaction commits it. Dropping any scope
//! without calling [`TransactionScope::complete`] rolls the transaction back,
//! including a joined one: an inner failure dooms the enclosing transaction.
//!
//! Scopes are thread-bound and therefore `!Send`.

use crate::coordinator::{Transaction, TransactionCoordinator};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use tracing::debug;
use txmap_core::Result;

thread_local! {
    static CURRENT: RefCell<Option<Transaction>> = const { RefCell::new(None) };
}

pub(crate) fn current() -> Option<Transaction> {
    CURRENT.with(|current| current.borrow().clone())
}

fn install(txn: &Transaction) {
    CURRENT.with(|current| *current.borrow_mut() = Some(txn.clone()));
}

fn uninstall(txn: &Transaction) {
    CURRENT.with(|current| {
        let mut current = current.borrow_mut();
        if current.as_ref().map(Transaction::id) == Some(txn.id()) {
            *current = None;
        }
    });
}

/// Join-or-begin scope for the calling thread's ambient transaction
pub struct TransactionScope {
    transaction: Transaction,
    owner: bool,
    completed: bool,
    _thread_bound: PhantomData<Rc<()>>,
}

impl TransactionScope {
    /// Join the current transaction or begin one on `coordinator`
    pub fn required(coordinator: &TransactionCoordinator) -> Self {
        match current() {
            Some(transaction) => {
                debug!(target: "txmap::txn", txn_id = %transaction.id(), "Joined ambient transaction");
                Self {
                    transaction,
                    owner: false,
                    completed: false,
                    _thread_bound: PhantomData,
                }
            }
            None => {
                let transaction = coordinator.begin();
                install(&transaction);
                Self {
                    transaction,
                    owner: true,
                    completed: false,
                    _thread_bound: PhantomData,
                }
            }
        }
    }

    /// Transaction this scope runs in
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Whether this scope began (and will commit) the transaction
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Mark the scope successful
    ///
    /// The owning scope commits here; a joined scope leaves the outcome to
    /// its owner.
    ///
    /// # Errors
    /// Whatever [`Transaction::commit`] reports for an owning scope.
    pub fn complete(mut self) -> Result<()> {
        self.completed = true;
        if self.owner {
            uninstall(&self.transaction);
            self.transaction.commit()
        } else {
            Ok(())
        }
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if self.owner {
            uninstall(&self.transaction);
        }
        if !self.completed && self.transaction.is_active() {
            debug!(target: "txmap::txn", txn_id = %self.transaction.id(), "Scope dropped without completion, rolling back");
            let _ = self.transaction.rollback();
        }
    }
}
