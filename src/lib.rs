//! txmap - transactional in-memory keyed map
//!
//! Callers read and write inside a transaction, either an ambient one
//! (implicit calls) or an explicit handle. One store-wide three-mode lock,
//! owned per transaction, serializes conflicting access: readers share,
//! writers escalate from upgradeable to exclusive, and every lock a
//! transaction takes is released when it commits or rolls back.
//!
//! # Quick Start
//!
//! ```
//! use txmap::{DataUnit, TransactionalMap};
//!
//! let map = TransactionalMap::new();
//! map.add(DataUnit::new(1, "alice"))?;
//! assert!(map.contains(1)?);
//!
//! let txn = map.begin();
//! map.update_in(DataUnit::new(1, "bob"), &txn)?;
//! assert_eq!(*map.read_in(1, &txn)?.payload(), "bob");
//! txn.commit()?;
//! # Ok::<(), txmap::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod map;

pub use map::TransactionalMap;
pub use txmap_concurrency::{GenericLock, LockMode, LockState, TransactionContext};
pub use txmap_core::{DataUnit, Error, Key, LockContext, Result, Storage, TransactionId};
pub use txmap_engine::{
    EnlistmentNotification, EnlistmentOptions, ExecutorCollection, MapConfig, Transaction,
    TransactionCoordinator, TransactionScope, TransactionStatus,
};
pub use txmap_storage::Store;
