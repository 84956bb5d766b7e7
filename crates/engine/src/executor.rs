//! Minimal two-phase-commit participant anchoring a transaction's context
//!
//! Store mutations are applied eagerly, so there is nothing to validate at
//! prepare and nothing to compensate at rollback. A failed or panicking
//! validation becomes a rollback vote. The participant always
//! acknowledges so it never stalls the coordinator; lock teardown happens in
//! the completion callback registered by the executor collection.

use crate::coordinator::{Enlistment, EnlistmentNotification, PreparingEnlistment};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, trace, warn};
use txmap_concurrency::TransactionContext;
use txmap_core::Result;

/// Volatile participant owning one transaction's lock context
#[derive(Debug)]
pub struct TransactionExecutor {
    context: Arc<TransactionContext>,
    #[cfg(test)]
    prepare_failure: Option<PrepareFailure>,
}

#[cfg(test)]
#[derive(Debug, Clone, Copy)]
enum PrepareFailure {
    Error,
    Panic,
}

impl TransactionExecutor {
    /// Wrap a context
    pub fn new(context: TransactionContext) -> Self {
        Self {
            context: Arc::new(context),
            #[cfg(test)]
            prepare_failure: None,
        }
    }

    /// Lock context of this transaction
    pub fn context(&self) -> &Arc<TransactionContext> {
        &self.context
    }

    fn validate(&self) -> Result<()> {
        #[cfg(test)]
        match self.prepare_failure {
            Some(PrepareFailure::Error) => {
                return Err(txmap_core::Error::usage("prepare", "validation rejected"))
            }
            Some(PrepareFailure::Panic) => panic!("validation panicked"),
            None => {}
        }
        Ok(())
    }
}

impl EnlistmentNotification for TransactionExecutor {
    fn prepare(&self, enlistment: &PreparingEnlistment) {
        let txn_id = enlistment.transaction_id();
        match catch_unwind(AssertUnwindSafe(|| self.validate())) {
            Ok(Ok(())) => enlistment.prepared(),
            Ok(Err(e)) => {
                warn!(target: "txmap::executor", %txn_id, error = %e, "Prepare failed, voting rollback");
                enlistment.force_rollback();
            }
            Err(_) => {
                error!(target: "txmap::executor", %txn_id, "Prepare panicked, voting rollback");
                enlistment.force_rollback();
            }
        }
    }

    fn commit(&self, enlistment: &Enlistment) {
        trace!(target: "txmap::executor", txn_id = %enlistment.transaction_id(), "Commit");
        enlistment.done();
    }

    fn rollback(&self, enlistment: &Enlistment) {
        trace!(target: "txmap::executor", txn_id = %enlistment.transaction_id(), "Rollback");
        enlistment.done();
    }

    fn in_doubt(&self, enlistment: &Enlistment) {
        trace!(target: "txmap::executor", txn_id = %enlistment.transaction_id(), "In doubt");
        enlistment.done();
    }
}
