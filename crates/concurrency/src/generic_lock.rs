//! Three-mode lock keyed by caller-supplied owner identity
//!
//! Modes:
//! - Shared: any number of distinct owners, excluded by exclusive
//! - Upgradeable: one owner at a time, coexists with shared owners,
//!   and may escalate to exclusive without releasing
//! - Exclusive: one owner, excludes everything else
//!
//! Ownership is tracked by an explicit `Id` rather than by thread, so one
//! transaction may enter on one thread and exit on another. Recursion is not
//! allowed: entering a mode the id already holds, or entering shared from
//! exclusive/upgradeable (and vice versa), is a usage violation.
//!
//! ## Waiting
//!
//! All fields live behind one short-held `parking_lot::Mutex`. A contended
//! acquirer parks on a condvar (which releases the mutex) for at most the
//! backoff interval, then retests. Exits notify every waiter. Waiters race
//! after each wakeup: there is no FIFO ordering, only eventual progress.
//! There is no timeout or cancellation.
//!
//! ## Escalation
//!
//! The upgradeable owner escalates to exclusive only once it is the sole
//! owner, i.e. escalation waits for concurrent shared owners to exit. New
//! shared entries are still admitted while it waits.

use crate::lock_state::LockState;
use parking_lot::{Condvar, Mutex, MutexGuard};
use rustc_hash::FxHashSet;
use std::fmt;
use std::hash::Hash;
use std::time::Duration;
use tracing::{debug, trace};
use txmap_core::{Error, Result};

/// Default upper bound on a single wait before retesting
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(10);

/// Lock mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Read access, shared with other readers
    Shared,
    /// Read access with the right to escalate to exclusive
    Upgradeable,
    /// Write access
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Shared => write!(f, "shared"),
            LockMode::Upgradeable => write!(f, "upgradeable"),
            LockMode::Exclusive => write!(f, "exclusive"),
        }
    }
}

struct Owners<Id> {
    state: LockState,
    exclusive: Option<Id>,
    upgradeable: Option<Id>,
    shared: FxHashSet<Id>,
}

impl<Id: Eq + Hash> Owners<Id> {
    fn holds_exclusive(&self, id: &Id) -> bool {
        self.exclusive.as_ref() == Some(id)
    }

    fn holds_upgradeable(&self, id: &Id) -> bool {
        self.upgradeable.as_ref() == Some(id)
    }

    fn holds_shared(&self, id: &Id) -> bool {
        self.shared.contains(id)
    }
}

/// Shared / upgradeable / exclusive lock with explicit owner ids
pub struct GenericLock<Id> {
    owners: Mutex<Owners<Id>>,
    released: Condvar,
    backoff: Duration,
}

impl<Id> GenericLock<Id>
where
    Id: Eq + Hash + Clone + fmt::Debug,
{
    /// Create a free lock with the default backoff
    pub fn new() -> Self {
        Self::with_backoff(DEFAULT_BACKOFF)
    }

    /// Create a free lock that retests at least every `backoff`
    pub fn with_backoff(backoff: Duration) -> Self {
        Self {
            owners: Mutex::new(Owners {
                state: LockState::new(),
                exclusive: None,
                upgradeable: None,
                shared: FxHashSet::default(),
            }),
            released: Condvar::new(),
            backoff,
        }
    }

    /// Backoff interval between retests
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Whether `id` currently holds exclusive mode
    pub fn exclusive_taken_by(&self, id: &Id) -> bool {
        self.owners.lock().holds_exclusive(id)
    }

    /// Whether `id` currently holds shared mode
    pub fn shared_taken_by(&self, id: &Id) -> bool {
        self.owners.lock().holds_shared(id)
    }

    /// Whether `id` currently holds upgradeable mode
    pub fn upgradeable_taken_by(&self, id: &Id) -> bool {
        self.owners.lock().holds_upgradeable(id)
    }

    /// Point-in-time copy of the counters
    pub fn state(&self) -> LockState {
        self.owners.lock().state
    }

    /// Acquire exclusive mode, blocking until available
    ///
    /// Succeeds immediately when nobody holds the lock. The upgradeable
    /// owner escalates once all shared owners have exited.
    ///
    /// # Errors
    /// `UsageViolation` if `id` already holds exclusive or holds shared.
    pub fn enter_exclusive(&self, id: &Id) -> Result<()> {
        let mut owners = self.owners.lock();
        if owners.holds_exclusive(id) {
            return Err(violation("enter_exclusive", id, "recursion is not allowed"));
        }
        if owners.holds_shared(id) {
            return Err(violation(
                "enter_exclusive",
                id,
                "exclusive is not allowed while holding shared",
            ));
        }

        loop {
            if owners.state.can_take_exclusive() {
                break;
            }
            if owners.holds_upgradeable(id) && owners.state.can_escalate() {
                trace!(target: "txmap::lock", owner = ?id, "Escalating upgradeable to exclusive");
                break;
            }
            self.wait(&mut owners, LockMode::Exclusive, id);
        }

        owners.state.set_exclusive_flag();
        owners.exclusive = Some(id.clone());
        Ok(())
    }

    /// Release exclusive mode
    ///
    /// An escalated owner keeps its upgradeable hold.
    ///
    /// # Errors
    /// `UsageViolation` unless `id` is the exclusive owner.
    pub fn exit_exclusive(&self, id: &Id) -> Result<()> {
        let mut owners = self.owners.lock();
        if !owners.holds_exclusive(id) {
            return Err(violation("exit_exclusive", id, "exclusive is not held by this owner"));
        }
        owners.state.reset_exclusive_flag();
        owners.exclusive = None;
        drop(owners);
        self.released.notify_all();
        Ok(())
    }

    /// Acquire shared mode, blocking while exclusive is held
    ///
    /// # Errors
    /// `UsageViolation` if `id` already holds any mode.
    pub fn enter_shared(&self, id: &Id) -> Result<()> {
        let mut owners = self.owners.lock();
        if owners.holds_exclusive(id) {
            return Err(violation(
                "enter_shared",
                id,
                "shared is not allowed while holding exclusive",
            ));
        }
        if owners.holds_upgradeable(id) {
            return Err(violation(
                "enter_shared",
                id,
                "shared is not allowed while holding upgradeable",
            ));
        }
        if owners.holds_shared(id) {
            return Err(violation("enter_shared", id, "recursion is not allowed"));
        }

        while !owners.state.can_take_shared() {
            self.wait(&mut owners, LockMode::Shared, id);
        }

        owners.state.take_shared();
        owners.shared.insert(id.clone());
        Ok(())
    }

    /// Release shared mode
    ///
    /// # Errors
    /// `UsageViolation` unless `id` holds shared.
    pub fn exit_shared(&self, id: &Id) -> Result<()> {
        let mut owners = self.owners.lock();
        if !owners.shared.remove(id) {
            return Err(violation("exit_shared", id, "shared is not held by this owner"));
        }
        owners.state.release_shared();
        drop(owners);
        self.released.notify_all();
        Ok(())
    }

    /// Acquire upgradeable mode, blocking while another owner holds
    /// upgradeable or exclusive
    ///
    /// # Errors
    /// `UsageViolation` if `id` already holds any mode.
    pub fn enter_upgradeable(&self, id: &Id) -> Result<()> {
        let mut owners = self.owners.lock();
        if owners.holds_upgradeable(id) || owners.holds_exclusive(id) || owners.holds_shared(id) {
            return Err(violation("enter_upgradeable", id, "recursion is not allowed"));
        }

        while !owners.state.can_take_upgradeable() {
            self.wait(&mut owners, LockMode::Upgradeable, id);
        }

        owners.state.take_upgradeable();
        owners.upgradeable = Some(id.clone());
        Ok(())
    }

    /// Release upgradeable mode
    ///
    /// # Errors
    /// `UsageViolation` unless `id` is the upgradeable owner.
    pub fn exit_upgradeable(&self, id: &Id) -> Result<()> {
        let mut owners = self.owners.lock();
        if !owners.holds_upgradeable(id) {
            return Err(violation(
                "exit_upgradeable",
                id,
                "upgradeable is not held by this owner",
            ));
        }
        owners.upgradeable = None;
        owners.state.release_upgradeable();
        drop(owners);
        self.released.notify_all();
        Ok(())
    }

    fn wait(&self, owners: &mut MutexGuard<'_, Owners<Id>>, mode: LockMode, id: &Id) {
        let backoff = self.backoff();
        trace!(target: "txmap::lock", owner = ?id, %mode, backoff_ms = backoff.as_millis() as u64, "Lock contended, backing off");
        // Timed out or notified, the caller retests either way.
        let _ = self.released.wait_for(owners, backoff);
    }
}

impl<Id> Default for GenericLock<Id>
where
    Id: Eq + Hash + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: fmt::Debug> fmt::Debug for GenericLock<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owners = self.owners.lock();
        f.debug_struct("GenericLock")
            .field("state", &owners.state)
            .field("exclusive", &owners.exclusive)
            .field("upgradeable", &owners.upgradeable)
            .field("shared", &owners.shared.len())
            .finish()
    }
}

fn violation<Id: fmt::Debug>(operation: &'static str, id: &Id, reason: &str) -> Error {
    debug!(target: "txmap::lock", operation, owner = ?id, reason, "Lock usage violation");
    Error::usage(operation, format!("{reason} (owner {id:?})"))
}
