//! Counter state of a [`GenericLock`](crate::GenericLock)
//!
//! `owners` packs two things into one word:
//! - bit 31: exclusive flag
//! - bits 0..=30: number of shared plus upgradeable holders
//!
//! Setting the exclusive flag pushes `owners` above [`MAX_SHARED`], so the
//! single comparison in `can_take_shared` also rejects entry while exclusive
//! is held. The upgradeable holder counts as a shared owner for that check.
//!
//! No synchronization here; the owning lock mutates this under its mutex.

const EXCLUSIVE_FLAG: u32 = 1 << 31;
const SHARED_MASK: u32 = EXCLUSIVE_FLAG - 1;

/// Maximum number of concurrent shared plus upgradeable owners
pub const MAX_SHARED: u32 = EXCLUSIVE_FLAG - 2;

/// Owner counter with a reserved exclusive bit, plus the upgrade flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockState {
    owners: u32,
    upgrade_taken: bool,
}

impl LockState {
    /// Free state
    pub const fn new() -> Self {
        Self {
            owners: 0,
            upgrade_taken: false,
        }
    }

    /// Nobody holds any mode
    pub fn can_take_exclusive(&self) -> bool {
        self.owners == 0
    }

    /// Exclusive is not held and the shared count has room
    pub fn can_take_shared(&self) -> bool {
        self.owners < MAX_SHARED
    }

    /// No upgradeable holder and shared entry is possible
    pub fn can_take_upgradeable(&self) -> bool {
        !self.upgrade_taken && self.can_take_shared()
    }

    /// The upgradeable holder is the only owner left
    pub fn can_escalate(&self) -> bool {
        self.upgrade_taken && self.owners == 1
    }

    /// Count one more shared owner
    pub fn take_shared(&mut self) {
        debug_assert!(self.can_take_shared());
        self.owners += 1;
    }

    /// Count one less shared owner
    pub fn release_shared(&mut self) {
        debug_assert!(self.shared_count() > 0);
        self.owners -= 1;
    }

    /// Count the upgradeable owner
    pub fn take_upgradeable(&mut self) {
        debug_assert!(self.can_take_upgradeable());
        self.owners += 1;
        self.upgrade_taken = true;
    }

    /// Drop the upgradeable owner
    pub fn release_upgradeable(&mut self) {
        debug_assert!(self.upgrade_taken && self.shared_count() > 0);
        self.owners -= 1;
        self.upgrade_taken = false;
    }

    /// Mark exclusive as held
    pub fn set_exclusive_flag(&mut self) {
        self.owners |= EXCLUSIVE_FLAG;
    }

    /// Mark exclusive as released
    pub fn reset_exclusive_flag(&mut self) {
        self.owners &= !EXCLUSIVE_FLAG;
    }

    /// Whether the exclusive flag is set
    pub fn is_exclusive(&self) -> bool {
        self.owners & EXCLUSIVE_FLAG != 0
    }

    /// Shared plus upgradeable holders
    pub fn shared_count(&self) -> u32 {
        self.owners & SHARED_MASK
    }

    /// Whether an upgradeable holder exists
    pub fn upgrade_taken(&self) -> bool {
        self.upgrade_taken
    }

    /// No mode held at all
    pub fn is_free(&self) -> bool {
        self.owners == 0 && !self.upgrade_taken
    }
}
