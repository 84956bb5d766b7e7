//! In-process two-phase-commit coordinator
//!
//! Transactions are created by a [`TransactionCoordinator`], carry a globally
//! unique [`TransactionId`], accept volatile participants and completion
//! callbacks, and drive their participants through
//! prepare → (commit | rollback) → in-doubt.
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. Active → Preparing
//! 2. prepare() on every participant, including ones enlisted during prepare
//!    (a panicking participant counts as a rollback vote)
//! 3. Any rollback vote      → rollback() on all, status Aborted
//!    Any missing done()     → in_doubt() on all, status InDoubt
//!    Otherwise              → commit() on all, status Committed
//! 4. Completion callbacks fire exactly once, outside the state lock
//! ```
//!
//! A transaction whose last handle is dropped while still active is rolled
//! back, so its participants and callbacks are never stranded.

use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use txmap_core::{Error, Result, TransactionId};

/// Final or current state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Accepting work
    Active,
    /// All participants committed
    Committed,
    /// Rolled back, explicitly or by a participant's vote
    Aborted,
    /// A participant never acknowledged its vote
    InDoubt,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Active => write!(f, "active"),
            TransactionStatus::Committed => write!(f, "committed"),
            TransactionStatus::Aborted => write!(f, "aborted"),
            TransactionStatus::InDoubt => write!(f, "in-doubt"),
        }
    }
}

/// Enlistment behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnlistmentOptions {
    /// Plain volatile participant
    #[default]
    None,
    /// The participant may enlist further participants while preparing
    EnlistDuringPrepareRequired,
}

/// Phase-two acknowledgement handle
#[derive(Debug)]
pub struct Enlistment {
    txn_id: TransactionId,
    done: AtomicBool,
}

impl Enlistment {
    fn new(txn_id: TransactionId) -> Self {
        Self {
            txn_id,
            done: AtomicBool::new(false),
        }
    }

    /// Transaction being notified
    pub fn transaction_id(&self) -> TransactionId {
        self.txn_id
    }

    /// Acknowledge the notification
    pub fn done(&self) {
        self.done.store(true, Ordering::Release);
    }

    fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

/// Phase-one voting handle
#[derive(Debug)]
pub struct PreparingEnlistment {
    enlistment: Enlistment,
    rollback: AtomicBool,
}

impl PreparingEnlistment {
    fn new(txn_id: TransactionId) -> Self {
        Self {
            enlistment: Enlistment::new(txn_id),
            rollback: AtomicBool::new(false),
        }
    }

    /// Transaction being prepared
    pub fn transaction_id(&self) -> TransactionId {
        self.enlistment.txn_id
    }

    /// Vote to commit and acknowledge
    pub fn prepared(&self) {
        self.enlistment.done();
    }

    /// Vote to roll back and acknowledge
    pub fn force_rollback(&self) {
        self.rollback.store(true, Ordering::Release);
        self.enlistment.done();
    }

    /// Acknowledge the vote; commits unless `force_rollback` was called
    pub fn done(&self) {
        self.enlistment.done();
    }

    fn voted_rollback(&self) -> bool {
        self.rollback.load(Ordering::Acquire)
    }
}

/// Volatile two-phase-commit participant
pub trait EnlistmentNotification: Send + Sync {
    /// Phase one: vote
    fn prepare(&self, enlistment: &PreparingEnlistment);
    /// Phase two: the transaction committed
    fn commit(&self, enlistment: &Enlistment);
    /// Phase two: the transaction rolled back
    fn rollback(&self, enlistment: &Enlistment);
    /// Phase two: the outcome is unknown
    fn in_doubt(&self, enlistment: &Enlistment);
}

/// Delivered to completion callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOutcome {
    /// Completed transaction
    pub txn_id: TransactionId,
    /// Final status, never `Active`
    pub status: TransactionStatus,
}

/// Callback fired once when a transaction completes
pub type CompletionCallback = Box<dyn FnOnce(&TransactionOutcome) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Active,
    Preparing,
    Finishing,
    Completed,
}

struct TxnState {
    status: TransactionStatus,
    phase: Phase,
    participants: Vec<Arc<dyn EnlistmentNotification>>,
    allow_enlist_during_prepare: bool,
    completion: Vec<CompletionCallback>,
}

#[derive(Debug, Default)]
struct CoordinatorStats {
    started: AtomicU64,
    committed: AtomicU64,
    aborted: AtomicU64,
    in_doubt: AtomicU64,
}

struct TransactionInner {
    id: TransactionId,
    state: Mutex<TxnState>,
    stats: Arc<CoordinatorStats>,
}

impl TransactionInner {
    fn commit(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.phase != Phase::Active {
                return Err(Error::TransactionInactive(self.id));
            }
            state.phase = Phase::Preparing;
        }
        debug!(target: "txmap::txn", txn_id = %self.id, "Preparing");

        // Participants may enlist others while preparing, so re-read the list
        // on every step instead of iterating a snapshot.
        let mut outcome = TransactionStatus::Committed;
        let mut index = 0;
        loop {
            let participant = self.state.lock().participants.get(index).cloned();
            let Some(participant) = participant else {
                break;
            };
            index += 1;

            let enlistment = PreparingEnlistment::new(self.id);
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| participant.prepare(&enlistment))) {
                error!(target: "txmap::txn", txn_id = %self.id, panic = panic_message(&*panic), "Participant panicked in prepare, rolling back");
                outcome = TransactionStatus::Aborted;
                break;
            }
            if !enlistment.enlistment.is_done() {
                warn!(target: "txmap::txn", txn_id = %self.id, "Participant did not acknowledge prepare");
                outcome = TransactionStatus::InDoubt;
                break;
            }
            if enlistment.voted_rollback() {
                info!(target: "txmap::txn", txn_id = %self.id, "Participant voted rollback");
                outcome = TransactionStatus::Aborted;
                break;
            }
        }

        self.notify_phase_two(outcome);
        match outcome {
            TransactionStatus::Committed => Ok(()),
            TransactionStatus::InDoubt => Err(Error::TransactionInDoubt(self.id)),
            _ => Err(Error::TransactionAborted(self.id)),
        }
    }

    fn rollback(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.phase != Phase::Active {
                return Err(Error::TransactionInactive(self.id));
            }
            state.phase = Phase::Finishing;
        }
        self.notify_phase_two(TransactionStatus::Aborted);
        Ok(())
    }

    fn notify_phase_two(&self, outcome: TransactionStatus) {
        let participants = {
            let mut state = self.state.lock();
            state.phase = Phase::Finishing;
            state.participants.clone()
        };

        for participant in participants {
            let enlistment = Enlistment::new(self.id);
            let notified = catch_unwind(AssertUnwindSafe(|| match outcome {
                TransactionStatus::Committed => participant.commit(&enlistment),
                TransactionStatus::InDoubt => participant.in_doubt(&enlistment),
                _ => participant.rollback(&enlistment),
            }));
            if let Err(panic) = notified {
                error!(target: "txmap::txn", txn_id = %self.id, %outcome, panic = panic_message(&*panic), "Participant panicked in phase two");
            } else if !enlistment.is_done() {
                warn!(target: "txmap::txn", txn_id = %self.id, %outcome, "Participant did not acknowledge");
            }
        }

        self.finish(outcome);
    }

    fn finish(&self, status: TransactionStatus) {
        let callbacks = {
            let mut state = self.state.lock();
            state.status = status;
            state.phase = Phase::Completed;
            state.participants.clear();
            std::mem::take(&mut state.completion)
        };

        let counter = match status {
            TransactionStatus::Committed => &self.stats.committed,
            TransactionStatus::InDoubt => &self.stats.in_doubt,
            _ => &self.stats.aborted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        info!(target: "txmap::txn", txn_id = %self.id, %status, "Transaction completed");

        let outcome = TransactionOutcome {
            txn_id: self.id,
            status,
        };
        for callback in callbacks {
            callback(&outcome);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("(non-string panic)")
}

impl Drop for TransactionInner {
    fn drop(&mut self) {
        if self.state.get_mut().phase == Phase::Active {
            warn!(target: "txmap::txn", txn_id = %self.id, "Transaction dropped while active, rolling back");
            let _ = self.rollback();
        }
    }
}

/// Handle to a transaction
///
/// Cheap to clone; all clones refer to the same transaction.
#[derive(Clone)]
pub struct Transaction {
    inner: Arc<TransactionInner>,
}

impl Transaction {
    /// Globally unique identifier
    pub fn id(&self) -> TransactionId {
        self.inner.id
    }

    /// Current status
    pub fn status(&self) -> TransactionStatus {
        self.inner.state.lock().status
    }

    /// Whether the transaction still accepts work
    pub fn is_active(&self) -> bool {
        self.inner.state.lock().phase == Phase::Active
    }

    /// Ambient transaction of the calling thread, if a scope installed one
    pub fn current() -> Option<Transaction> {
        crate::scope::current()
    }

    /// Enlist a volatile participant
    ///
    /// While the transaction is preparing, enlistment is only accepted if an
    /// earlier participant was enlisted with
    /// [`EnlistmentOptions::EnlistDuringPrepareRequired`].
    ///
    /// # Errors
    /// - `TransactionInactive` once phase two has begun
    /// - `UsageViolation` for an undeclared enlistment during prepare
    pub fn enlist_volatile(
        &self,
        participant: Arc<dyn EnlistmentNotification>,
        options: EnlistmentOptions,
    ) -> Result<()> {
        let mut state = self.inner.state.lock();
        match state.phase {
            Phase::Active => {}
            Phase::Preparing if state.allow_enlist_during_prepare => {}
            Phase::Preparing => {
                return Err(Error::usage(
                    "enlist_volatile",
                    "enlistment during prepare requires EnlistDuringPrepareRequired",
                ))
            }
            Phase::Finishing | Phase::Completed => {
                return Err(Error::TransactionInactive(self.inner.id))
            }
        }
        if options == EnlistmentOptions::EnlistDuringPrepareRequired {
            state.allow_enlist_during_prepare = true;
        }
        state.participants.push(participant);
        Ok(())
    }

    /// Register a callback fired exactly once on completion, on every path
    ///
    /// # Errors
    /// `TransactionInactive` if the transaction has already completed.
    pub fn on_completed(&self, callback: CompletionCallback) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.phase == Phase::Completed {
            return Err(Error::TransactionInactive(self.inner.id));
        }
        state.completion.push(callback);
        Ok(())
    }

    /// Run two-phase commit
    ///
    /// # Errors
    /// - `TransactionInactive` if already committing or completed
    /// - `TransactionAborted` if a participant voted rollback
    /// - `TransactionInDoubt` if a participant never acknowledged its vote
    pub fn commit(&self) -> Result<()> {
        self.inner.commit()
    }

    /// Roll back
    ///
    /// # Errors
    /// `TransactionInactive` if already committing or completed.
    pub fn rollback(&self) -> Result<()> {
        self.inner.rollback()
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.inner.id)
            .field("status", &self.status())
            .finish()
    }
}

/// Creates transactions and tracks their outcomes
///
/// Counters use Relaxed ordering; they are observational only.
#[derive(Debug, Default)]
pub struct TransactionCoordinator {
    stats: Arc<CoordinatorStats>,
}

impl TransactionCoordinator {
    /// Create a coordinator with zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new transaction with a fresh identifier
    pub fn begin(&self) -> Transaction {
        let id = TransactionId::new();
        self.stats.started.fetch_add(1, Ordering::Relaxed);
        debug!(target: "txmap::txn", txn_id = %id, "Transaction started");
        Transaction {
            inner: Arc::new(TransactionInner {
                id,
                state: Mutex::new(TxnState {
                    status: TransactionStatus::Active,
                    phase: Phase::Active,
                    participants: Vec::new(),
                    allow_enlist_during_prepare: false,
                    completion: Vec::new(),
                }),
                stats: Arc::clone(&self.stats),
            }),
        }
    }

    /// Transactions begun
    pub fn started(&self) -> u64 {
        self.stats.started.load(Ordering::Relaxed)
    }

    /// Transactions committed
    pub fn committed(&self) -> u64 {
        self.stats.committed.load(Ordering::Relaxed)
    }

    /// Transactions rolled back
    pub fn aborted(&self) -> u64 {
        self.stats.aborted.load(Ordering::Relaxed)
    }

    /// Transactions begun and not yet completed
    pub fn active(&self) -> u64 {
        let finished = self.committed()
            + self.aborted()
            + self.stats.in_doubt.load(Ordering::Relaxed);
        self.started().saturating_sub(finished)
    }
}
