//! TransactionalMap Integration Tests
//!
//! Store laws, concurrent transaction scenarios and transaction lifecycle
//! through the public facade.

mod common;

mod lifecycle;
mod scenarios;
mod store_laws;
