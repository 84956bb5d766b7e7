//! Multi-transaction scenarios

use crate::common::fast_map;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use txmap::{DataUnit, Error, TransactionStatus};

/// Two transactions adding distinct keys concurrently both succeed.
#[test]
fn test_concurrent_transactions_add_distinct_keys() {
    let map = Arc::new(fast_map());
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = [1i64, 2]
        .into_iter()
        .map(|key| {
            let map = Arc::clone(&map);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let txn = map.begin();
                barrier.wait();
                map.add_in(DataUnit::new(key, key * 100), &txn).unwrap();
                txn.commit().unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(map.contains(1).unwrap());
    assert!(map.contains(2).unwrap());
    assert_eq!(map.active_transactions(), 0);
}

/// Implicit calls from many threads each run in their own transaction.
#[test]
fn test_concurrent_implicit_adds() {
    let map = Arc::new(fast_map());
    let handles: Vec<_> = (0..8i64)
        .map(|worker| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for i in 0..25 {
                    map.add(DataUnit::new(worker * 1000 + i, worker)).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    for worker in 0..8i64 {
        for i in 0..25 {
            assert_eq!(map.read(worker * 1000 + i).unwrap().into_payload(), worker);
        }
    }
    assert_eq!(map.coordinator().committed(), 8 * 25 + 8 * 25);
}

/// A transaction adding the same key twice gets KeyConflict the second time.
#[test]
fn test_same_transaction_adds_key_twice() {
    let map = fast_map();
    let txn = map.begin();
    map.add_in(DataUnit::new(1, "a"), &txn).unwrap();
    let err = map.add_in(DataUnit::new(1, "b"), &txn).unwrap_err();
    assert!(matches!(err, Error::KeyConflict(1)));
    txn.commit().unwrap();

    assert!(map.contains(1).unwrap());
    assert_eq!(*map.read(1).unwrap().payload(), "a");
}

/// Readers in different transactions do not block each other.
#[test]
fn test_readers_share() {
    let map = fast_map();
    map.add(DataUnit::new(1, 1)).unwrap();

    let t1 = map.begin();
    let t2 = map.begin();
    assert!(map.contains_in(1, &t1).unwrap());
    assert!(map.contains_in(1, &t2).unwrap());
    assert_eq!(map.active_transactions(), 2);
    t1.commit().unwrap();
    t2.commit().unwrap();
}

/// A writer waits until the reading transaction completes.
#[test]
fn test_writer_waits_for_reader_transaction() {
    let map = Arc::new(fast_map());
    map.add(DataUnit::new(1, 1)).unwrap();

    let reader = map.begin();
    assert_eq!(map.read_in(1, &reader).unwrap().into_payload(), 1);

    let written = Arc::new(AtomicBool::new(false));
    let handle = {
        let map = Arc::clone(&map);
        let written = Arc::clone(&written);
        thread::spawn(move || {
            let writer = map.begin();
            map.update_in(DataUnit::new(1, 2), &writer).unwrap();
            written.store(true, Ordering::SeqCst);
            writer.commit().unwrap();
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!written.load(Ordering::SeqCst));
    assert_eq!(map.read_in(1, &reader).unwrap().into_payload(), 1);

    reader.commit().unwrap();
    handle.join().unwrap();
    assert_eq!(map.read(1).unwrap().into_payload(), 2);
}

/// Writers from different transactions are serialized until completion.
#[test]
fn test_writers_serialized_until_completion() {
    let map = Arc::new(fast_map());
    let order = Arc::new(Mutex::new(Vec::new()));

    let first = map.begin();
    map.add_in(DataUnit::new(1, 1), &first).unwrap();

    let handle = {
        let map = Arc::clone(&map);
        let order = Arc::clone(&order);
        thread::spawn(move || {
            let second = map.begin();
            map.add_in(DataUnit::new(2, 2), &second).unwrap();
            order.lock().push("second");
            second.commit().unwrap();
        })
    };

    thread::sleep(Duration::from_millis(50));
    order.lock().push("first");
    first.commit().unwrap();
    handle.join().unwrap();

    assert_eq!(*order.lock(), vec!["first", "second"]);
}

/// Reading then writing in one transaction switches to exclusive.
#[test]
fn test_read_then_write_in_one_transaction() {
    let map = fast_map();
    let txn = map.begin();
    assert!(!map.contains_in(9, &txn).unwrap());
    map.add_in(DataUnit::new(9, "nine"), &txn).unwrap();
    assert_eq!(*map.read_in(9, &txn).unwrap().payload(), "nine");
    txn.commit().unwrap();
    assert_eq!(txn.status(), TransactionStatus::Committed);
}

/// A read hold is given up when the transaction starts writing, so another
/// writer can commit between a transaction's check and its add.
#[test]
fn test_check_then_add_can_interleave_with_another_writer() {
    let map = Arc::new(fast_map::<&'static str>());
    let first = map.begin();
    assert!(!map.contains_in(7, &first).unwrap());

    let writer = {
        let map = Arc::clone(&map);
        thread::spawn(move || {
            let second = map.begin();
            map.add_in(DataUnit::new(7, "second"), &second).unwrap();
            second.commit().unwrap();
        })
    };

    // Second writer holds upgradeable and waits for the read hold to drain.
    while !map.lock().state().upgrade_taken() {
        thread::sleep(Duration::from_millis(1));
    }

    assert!(matches!(
        map.add_in(DataUnit::new(7, "first"), &first),
        Err(Error::KeyConflict(7))
    ));
    writer.join().unwrap();
    assert_eq!(*map.read_in(7, &first).unwrap().payload(), "second");
    first.commit().unwrap();
    assert!(map.lock().state().is_free());
}
