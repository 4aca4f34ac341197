// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory local storage area.
//
// Uses a `BTreeMap` behind a std `RwLock`. Clones share the same map, which
// models two scripts on one origin seeing the same local store.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::backend::LocalStorageArea;
use crate::error::StorageError;

/// An in-memory [`LocalStorageArea`] backed by a sorted `BTreeMap`.
///
/// All data lives in process memory and is lost when the last clone drops.
///
/// # Example
///
/// ```rust
/// use xel_storage::backend::LocalStorageArea;
/// use xel_storage::memory::InMemoryArea;
///
/// let area = InMemoryArea::new();
/// area.set_item("hello", "\"world\"").unwrap();
/// assert_eq!(area.get_item("hello").unwrap(), Some("\"world\"".to_string()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryArea {
    data: Arc<RwLock<BTreeMap<String, String>>>,
}

impl InMemoryArea {
    /// Create a new, empty area.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.read_lock().len()
    }

    /// True if the area holds no keys.
    pub fn is_empty(&self) -> bool {
        self.read_lock().is_empty()
    }

    /// All keys in lexicographic order.
    pub fn keys(&self) -> Vec<String> {
        self.read_lock().keys().cloned().collect()
    }

    // Poisoned locks are recovered: every mutation is a single map call.
    fn read_lock(&self) -> RwLockReadGuard<'_, BTreeMap<String, String>> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, BTreeMap<String, String>> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LocalStorageArea for InMemoryArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.write_lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.write_lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.write_lock().clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_crud() {
        let area = InMemoryArea::new();

        assert!(area.is_empty());
        assert_eq!(area.get_item("key1").unwrap(), None);

        area.set_item("key1", "value1").unwrap();
        assert_eq!(area.get_item("key1").unwrap(), Some("value1".to_string()));
        assert_eq!(area.len(), 1);

        // Overwrite.
        area.set_item("key1", "updated").unwrap();
        assert_eq!(area.get_item("key1").unwrap(), Some("updated".to_string()));
        assert_eq!(area.len(), 1);

        area.remove_item("key1").unwrap();
        assert_eq!(area.get_item("key1").unwrap(), None);
        assert!(area.is_empty());

        // Removing an absent key is fine.
        area.remove_item("nonexistent").unwrap();
    }

    #[test]
    fn test_clear_and_keys() {
        let area = InMemoryArea::new();
        area.set_item("b", "2").unwrap();
        area.set_item("a", "1").unwrap();
        assert_eq!(area.keys(), vec!["a".to_string(), "b".to_string()]);

        area.clear().unwrap();
        assert!(area.is_empty());
        assert!(area.keys().is_empty());
    }

    #[test]
    fn test_clone_shares_state() {
        let area = InMemoryArea::new();
        let clone = area.clone();

        area.set_item("shared", "data").unwrap();
        assert_eq!(clone.get_item("shared").unwrap(), Some("data".to_string()));
    }

    #[test]
    fn test_name() {
        assert_eq!(InMemoryArea::new().name(), "in-memory");
    }
}
