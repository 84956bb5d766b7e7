//! Storage layer for txmap
//!
//! This crate implements the keyed record map:
//! - Store: FxHashMap-backed storage implementing `Storage`
//!
//! Isolation is not decided here: each operation asks the caller's
//! `LockContext` for the right mode before touching the map.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod store;

pub use store::Store;
