//! TransactionalMap: the public facade
//!
//! Composes a [`Storage`] with an [`ExecutorCollection`] over one store-wide
//! [`GenericLock`]. Each operation comes in two shapes:
//!
//! - implicit (`add`, `read`, ...): opens a required [`TransactionScope`],
//!   forwards to the explicit form and completes the scope on success. On
//!   error the scope is dropped uncompleted, which rolls back the ambient
//!   transaction.
//! - explicit (`add_in`, `read_in`, ...): runs inside the given transaction.
//!
//! Locks taken by a transaction are held until it completes.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;
use txmap_concurrency::GenericLock;
use txmap_core::{DataUnit, Key, Result, Storage, TransactionId};
use txmap_engine::{
    ExecutorCollection, MapConfig, Transaction, TransactionCoordinator, TransactionScope,
};
use txmap_storage::Store;

/// Transactional keyed map
pub struct TransactionalMap<V, S = Store<V>> {
    storage: S,
    executors: ExecutorCollection,
    coordinator: Arc<TransactionCoordinator>,
    _payload: PhantomData<fn() -> V>,
}

impl<V> TransactionalMap<V>
where
    V: Clone + Send + Sync,
{
    /// Empty map with default configuration and its own coordinator
    pub fn new() -> Self {
        Self::build(
            Store::new(),
            &MapConfig::default(),
            Arc::new(TransactionCoordinator::new()),
        )
    }

    /// Empty map with the given configuration
    ///
    /// # Errors
    /// `Config` if the configuration is invalid.
    pub fn with_config(config: MapConfig) -> Result<Self> {
        Self::with_storage(Store::new(), config)
    }
}

impl<V> Default for TransactionalMap<V>
where
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, S> TransactionalMap<V, S>
where
    S: Storage<V>,
{
    /// Map over a custom storage backend
    ///
    /// # Errors
    /// `Config` if the configuration is invalid.
    pub fn with_storage(storage: S, config: MapConfig) -> Result<Self> {
        Self::with_coordinator(storage, config, Arc::new(TransactionCoordinator::new()))
    }

    /// Map whose transactions come from a shared coordinator
    ///
    /// # Errors
    /// `Config` if the configuration is invalid.
    pub fn with_coordinator(
        storage: S,
        config: MapConfig,
        coordinator: Arc<TransactionCoordinator>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(storage, &config, coordinator))
    }

    fn build(storage: S, config: &MapConfig, coordinator: Arc<TransactionCoordinator>) -> Self {
        let lock = Arc::new(GenericLock::with_backoff(config.lock_backoff()));
        debug!(target: "txmap::map", backoff_ms = config.lock_backoff_ms, "Map created");
        Self {
            storage,
            executors: ExecutorCollection::with_capacity(lock, config.executor_capacity),
            coordinator,
            _payload: PhantomData,
        }
    }

    /// Coordinator that begins this map's implicit transactions
    pub fn coordinator(&self) -> &Arc<TransactionCoordinator> {
        &self.coordinator
    }

    /// Begin an explicit transaction
    pub fn begin(&self) -> Transaction {
        self.coordinator.begin()
    }

    /// Store-wide lock shared by every transaction's context
    pub fn lock(&self) -> &Arc<GenericLock<TransactionId>> {
        self.executors.lock()
    }

    /// Transactions currently holding a lock context on this map
    pub fn active_transactions(&self) -> usize {
        self.executors.len()
    }

    /// Insert a new record in the ambient transaction
    ///
    /// # Errors
    /// `KeyConflict` if the key exists, or any transaction error.
    pub fn add(&self, data: DataUnit<V>) -> Result<()> {
        self.in_scope(|txn| self.add_in(data, txn))
    }

    /// Insert a new record in `txn`
    ///
    /// # Errors
    /// `KeyConflict` if the key exists, or any transaction error.
    pub fn add_in(&self, data: DataUnit<V>, txn: &Transaction) -> Result<()> {
        let ctx = self.executors.get(txn)?;
        self.storage.add(data, &*ctx)
    }

    /// Insert or replace a record in the ambient transaction
    ///
    /// # Errors
    /// Any transaction error.
    pub fn update(&self, data: DataUnit<V>) -> Result<()> {
        self.in_scope(|txn| self.update_in(data, txn))
    }

    /// Insert or replace a record in `txn`
    ///
    /// # Errors
    /// Any transaction error.
    pub fn update_in(&self, data: DataUnit<V>, txn: &Transaction) -> Result<()> {
        let ctx = self.executors.get(txn)?;
        self.storage.update(data, &*ctx)
    }

    /// Remove a record in the ambient transaction
    ///
    /// # Errors
    /// `KeyNotFound` if absent, or any transaction error.
    pub fn remove(&self, key: Key) -> Result<()> {
        self.in_scope(|txn| self.remove_in(key, txn))
    }

    /// Remove a record in `txn`
    ///
    /// # Errors
    /// `KeyNotFound` if absent, or any transaction error.
    pub fn remove_in(&self, key: Key, txn: &Transaction) -> Result<()> {
        let ctx = self.executors.get(txn)?;
        self.storage.remove(key, &*ctx)
    }

    /// Read a record in the ambient transaction
    ///
    /// # Errors
    /// `KeyNotFound` if absent, or any transaction error.
    pub fn read(&self, key: Key) -> Result<DataUnit<V>> {
        self.in_scope(|txn| self.read_in(key, txn))
    }

    /// Read a record in `txn`
    ///
    /// # Errors
    /// `KeyNotFound` if absent, or any transaction error.
    pub fn read_in(&self, key: Key, txn: &Transaction) -> Result<DataUnit<V>> {
        let ctx = self.executors.get(txn)?;
        self.storage.read(key, &*ctx)
    }

    /// Whether `key` exists, in the ambient transaction
    ///
    /// # Errors
    /// Any transaction error.
    pub fn contains(&self, key: Key) -> Result<bool> {
        self.in_scope(|txn| self.contains_in(key, txn))
    }

    /// Whether `key` exists, in `txn`
    ///
    /// # Errors
    /// Any transaction error.
    pub fn contains_in(&self, key: Key, txn: &Transaction) -> Result<bool> {
        let ctx = self.executors.get(txn)?;
        self.storage.contains(key, &*ctx)
    }

    fn in_scope<T>(&self, op: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let scope = TransactionScope::required(&self.coordinator);
        let value = op(scope.transaction())?;
        scope.complete()?;
        Ok(value)
    }
}

impl<V, S> std::fmt::Debug for TransactionalMap<V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionalMap")
            .field("executors", &self.executors)
            .finish()
    }
}
