//! Context creation and teardown tied to transaction completion

use crate::common::fast_map;
use std::sync::Arc;
use txmap::{
    DataUnit, Error, ExecutorCollection, GenericLock, LockContext, TransactionCoordinator,
    TransactionScope, TransactionStatus,
};

#[test]
fn test_context_identity_per_transaction() {
    let coordinator = TransactionCoordinator::new();
    let executors = ExecutorCollection::new(Arc::new(GenericLock::new()));

    let txn = coordinator.begin();
    let first = executors.get(&txn).unwrap();
    let again = executors.get(&txn).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(first.transaction_id(), txn.id());

    let other_txn = coordinator.begin();
    let other = executors.get(&other_txn).unwrap();
    assert!(!Arc::ptr_eq(&first, &other));

    txn.commit().unwrap();
    assert!(!executors.contains(&txn.id()));
    assert!(executors.contains(&other_txn.id()));
    other_txn.rollback().unwrap();
    assert!(executors.is_empty());
}

#[test]
fn test_commit_and_rollback_both_tear_down() {
    let map = fast_map();

    let committed = map.begin();
    map.add_in(DataUnit::new(1, 1), &committed).unwrap();
    assert_eq!(map.active_transactions(), 1);
    committed.commit().unwrap();
    assert_eq!(map.active_transactions(), 0);

    let rolled_back = map.begin();
    map.add_in(DataUnit::new(2, 2), &rolled_back).unwrap();
    rolled_back.rollback().unwrap();
    assert_eq!(map.active_transactions(), 0);

    // Nothing else holds the lock after either path.
    let next = map.begin();
    map.update_in(DataUnit::new(3, 3), &next).unwrap();
    next.commit().unwrap();
}

#[test]
fn test_rollback_does_not_undo_eager_writes() {
    let map = fast_map();
    let txn = map.begin();
    map.add_in(DataUnit::new(1, "kept"), &txn).unwrap();
    txn.rollback().unwrap();
    assert_eq!(txn.status(), TransactionStatus::Aborted);
    assert!(map.contains(1).unwrap());
}

#[test]
fn test_completed_transaction_rejected() {
    let map = fast_map::<u8>();
    let txn = map.begin();
    map.contains_in(1, &txn).unwrap();
    txn.commit().unwrap();
    assert!(matches!(
        map.add_in(DataUnit::new(1, 1), &txn),
        Err(Error::TransactionInactive(id)) if id == txn.id()
    ));
}

#[test]
fn test_implicit_calls_join_ambient_scope() {
    let map = fast_map();
    let scope = TransactionScope::required(map.coordinator());
    map.add(DataUnit::new(1, 'a')).unwrap();
    map.add(DataUnit::new(2, 'b')).unwrap();
    assert!(map.contains(1).unwrap());
    assert_eq!(map.active_transactions(), 1);
    assert_eq!(map.coordinator().started(), 1);

    scope.complete().unwrap();
    assert_eq!(map.active_transactions(), 0);
    assert_eq!(map.coordinator().committed(), 1);
}

#[test]
fn test_failed_implicit_call_dooms_ambient_scope() {
    let map = fast_map();
    map.add(DataUnit::new(1, 0u8)).unwrap();

    let scope = TransactionScope::required(map.coordinator());
    assert!(matches!(map.remove(7), Err(Error::KeyNotFound(7))));
    assert!(!scope.transaction().is_active());
    assert!(scope.complete().is_err());
    assert_eq!(map.active_transactions(), 0);
}

#[test]
fn test_shared_coordinator_across_maps() {
    let coordinator = Arc::new(TransactionCoordinator::new());
    let left = txmap::TransactionalMap::with_coordinator(
        txmap::Store::new(),
        txmap::MapConfig::default(),
        Arc::clone(&coordinator),
    )
    .unwrap();
    let right = txmap::TransactionalMap::with_coordinator(
        txmap::Store::new(),
        txmap::MapConfig::default(),
        Arc::clone(&coordinator),
    )
    .unwrap();

    let txn = coordinator.begin();
    left.add_in(DataUnit::new(1, "l"), &txn).unwrap();
    right.add_in(DataUnit::new(1, "r"), &txn).unwrap();
    txn.commit().unwrap();

    assert_eq!(left.active_transactions(), 0);
    assert_eq!(right.active_transactions(), 0);
    assert_eq!(*left.read(1).unwrap().payload(), "l");
    assert_eq!(*right.read(1).unwrap().payload(), "r");
}
