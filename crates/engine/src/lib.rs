//! Transaction lifecycle engine for txmap
//!
//! This crate binds lock contexts to transactions:
//! - TransactionCoordinator: in-process two-phase commit (begin, enlist, commit, rollback)
//! - TransactionScope: join-or-begin ambient transaction per thread
//! - TransactionExecutor: volatile participant anchoring one transaction's context
//! - ExecutorCollection: transaction -> context map with exactly-once teardown
//! - MapConfig: TOML configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod executor;
pub mod executor_collection;
pub mod scope;

pub use config::{MapConfig, CONFIG_FILE_NAME};
pub use coordinator::{
    CompletionCallback, Enlistment, EnlistmentNotification, EnlistmentOptions,
    PreparingEnlistment, Transaction, TransactionCoordinator, TransactionOutcome,
    TransactionStatus,
};
pub use executor::TransactionExecutor;
pub use executor_collection::ExecutorCollection;
pub use scope::TransactionScope;
