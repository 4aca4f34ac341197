// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Backing stores for the XelStore facade.
//
// `LocalStorageArea` is the synchronous string key/value contract of a local
// persistent store. `Backend` is the tagged variant the facade commits to at
// construction: either a local area or a managed host capability set. The
// arm never changes for the lifetime of a store.

use std::fmt;
use std::sync::Arc;

use crate::error::StorageError;
use crate::host::ManagedHost;

/// A synchronous, string-valued key/value area.
///
/// Mirrors the `getItem`/`setItem`/`removeItem`/`clear` surface of a browser
/// local store. Implementations must be safe to share across threads.
pub trait LocalStorageArea: Send + Sync {
    /// Retrieve the raw text stored under `key`, or `Ok(None)` if absent.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store raw text under `key`, overwriting any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every key in the area.
    fn clear(&self) -> Result<(), StorageError>;

    /// A human-readable name for this area, used in logging.
    fn name(&self) -> &str;
}

impl<A: LocalStorageArea + ?Sized> LocalStorageArea for Arc<A> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }

    fn clear(&self) -> Result<(), StorageError> {
        (**self).clear()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Which arm of [`Backend`] a store selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// A local persistent store.
    Local,
    /// A host-managed storage API.
    Managed,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Local => f.write_str("local"),
            BackendKind::Managed => f.write_str("managed"),
        }
    }
}

/// The backing store selected for a facade.
pub enum Backend {
    /// Local persistent store.
    Local(Arc<dyn LocalStorageArea>),
    /// Host-managed storage. Construction guarantees the get, set and delete
    /// primitives are present.
    Managed(Arc<ManagedHost>),
}

impl Backend {
    /// Which arm this backend is.
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Local(_) => BackendKind::Local,
            Backend::Managed(_) => BackendKind::Managed,
        }
    }

    /// Read raw text for `key`.
    pub fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            Backend::Local(area) => area.get_item(key),
            Backend::Managed(host) => host.get(key),
        }
    }

    /// Write raw text for `key`.
    pub fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            Backend::Local(area) => area.set_item(key, value),
            Backend::Managed(host) => host.set(key, value),
        }
    }

    /// Remove `key`.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self {
            Backend::Local(area) => area.remove_item(key),
            Backend::Managed(host) => host.delete(key),
        }
    }

    /// Remove every key.
    ///
    /// A managed host without a `list` primitive cannot enumerate its keys,
    /// so nothing is removed from it.
    pub fn clear(&self) -> Result<(), StorageError> {
        match self {
            Backend::Local(area) => area.clear(),
            Backend::Managed(host) => match host.list()? {
                Some(keys) => {
                    for key in keys {
                        host.delete(&key)?;
                    }
                    Ok(())
                }
                None => {
                    tracing::warn!("managed host has no list primitive; backend left uncleared");
                    Ok(())
                }
            },
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Local(area) => f.debug_tuple("Local").field(&area.name()).finish(),
            Backend::Managed(host) => f.debug_tuple("Managed").field(host).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryArea;

    #[test]
    fn test_local_arm_delegates() {
        let area = InMemoryArea::new();
        let backend = Backend::Local(Arc::new(area.clone()));
        assert_eq!(backend.kind(), BackendKind::Local);

        backend.write("a", "1").unwrap();
        assert_eq!(backend.read("a").unwrap(), Some("1".to_string()));
        assert_eq!(area.get_item("a").unwrap(), Some("1".to_string()));

        backend.remove("a").unwrap();
        assert_eq!(backend.read("a").unwrap(), None);
    }

    #[test]
    fn test_managed_clear_removes_listed_keys() {
        let area = InMemoryArea::new();
        let host = ManagedHost::over_area(area.clone());
        let backend = Backend::Managed(Arc::new(host));
        assert_eq!(backend.kind(), BackendKind::Managed);

        backend.write("x", "1").unwrap();
        backend.write("y", "2").unwrap();
        backend.clear().unwrap();

        assert!(area.is_empty());
    }

    #[test]
    fn test_managed_clear_without_list_is_noop() {
        let area = InMemoryArea::new();
        let (get_area, set_area, del_area) = (area.clone(), area.clone(), area.clone());
        let host = ManagedHost::new()
            .with_get(move |k| get_area.get_item(k))
            .with_set(move |k, v| set_area.set_item(k, v))
            .with_delete(move |k| del_area.remove_item(k));
        let backend = Backend::Managed(Arc::new(host));

        backend.write("kept", "true").unwrap();
        backend.clear().unwrap();
        assert_eq!(area.get_item("kept").unwrap(), Some("true".to_string()));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(BackendKind::Local.to_string(), "local");
        assert_eq!(BackendKind::Managed.to_string(), "managed");
    }
}
