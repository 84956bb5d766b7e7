//! Core types for txmap
//!
//! - TransactionId: globally unique identity of a transaction, used both as
//!   the lock owner and as the key of the transaction -> context map
//! - DataUnit: a stored record (64-bit key plus opaque payload)

use std::fmt;
use uuid::Uuid;

/// Key type of the store
pub type Key = i64;

/// Unique identifier for a transaction
///
/// A TransactionId is a wrapper around a UUID v4. It is assigned when a
/// transaction begins and is never reused after the transaction completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Create a new random TransactionId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record held by the store
///
/// The key is unique within a store; the payload is opaque to every layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUnit<V> {
    key: Key,
    payload: V,
}

impl<V> DataUnit<V> {
    /// Create a new record
    pub fn new(key: Key, payload: V) -> Self {
        Self { key, payload }
    }

    /// Record key
    pub fn key(&self) -> Key {
        self.key
    }

    /// Borrow the payload
    pub fn payload(&self) -> &V {
        &self.payload
    }

    /// Consume the record, returning its payload
    pub fn into_payload(self) -> V {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_transaction_id_unique() {
        let ids: HashSet<_> = (0..1000).map(|_| TransactionId::new()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_transaction_id_display_is_uuid() {
        let id = TransactionId::new();
        assert_eq!(id.to_string().len(), 36);
        assert_ne!(id, TransactionId::default());
    }

    #[test]
    fn test_data_unit_accessors() {
        let unit = DataUnit::new(42, "payload".to_string());
        assert_eq!(unit.key(), 42);
        assert_eq!(unit.payload(), "payload");
        assert_eq!(unit.into_payload(), "payload");
    }
}
