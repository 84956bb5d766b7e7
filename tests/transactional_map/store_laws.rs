//! Add/Remove/Contains laws through the facade

use crate::common::fast_map;
use txmap::{DataUnit, Error};

#[test]
fn test_add_then_contains() {
    let map = fast_map();
    map.add(DataUnit::new(10, "ten")).unwrap();
    assert!(map.contains(10).unwrap());
    assert!(!map.contains(11).unwrap());
}

#[test]
fn test_add_twice_conflicts_and_keeps_first() {
    let map = fast_map();
    map.add(DataUnit::new(1, "first")).unwrap();
    let err = map.add(DataUnit::new(1, "second")).unwrap_err();
    assert!(matches!(err, Error::KeyConflict(1)));
    assert_eq!(*map.read(1).unwrap().payload(), "first");
}

#[test]
fn test_remove_then_absent() {
    let map = fast_map();
    map.add(DataUnit::new(2, ())).unwrap();
    map.remove(2).unwrap();
    assert!(!map.contains(2).unwrap());
}

#[test]
fn test_remove_absent_key_not_found() {
    let map = fast_map();
    map.add(DataUnit::new(3, 30)).unwrap();
    assert!(matches!(map.remove(4), Err(Error::KeyNotFound(4))));
    assert_eq!(map.read(3).unwrap().into_payload(), 30);
}

#[test]
fn test_read_absent_key_not_found() {
    let map = fast_map::<String>();
    assert!(matches!(map.read(5), Err(Error::KeyNotFound(5))));
}

#[test]
fn test_update_replaces_or_inserts() {
    let map = fast_map();
    map.update(DataUnit::new(6, 1)).unwrap();
    map.update(DataUnit::new(6, 2)).unwrap();
    assert_eq!(map.read(6).unwrap().into_payload(), 2);
}

#[test]
fn test_negative_and_extreme_keys() {
    let map = fast_map();
    for key in [i64::MIN, -1, 0, i64::MAX] {
        map.add(DataUnit::new(key, key)).unwrap();
    }
    for key in [i64::MIN, -1, 0, i64::MAX] {
        assert_eq!(map.read(key).unwrap().into_payload(), key);
    }
}
