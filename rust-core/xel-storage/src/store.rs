// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Versioned key/value facade.
//
// A `VersionedStore` commits to one backend at construction, keeps a
// read-through/write-through cache of decoded JSON values, and compares its
// encoded version against the persisted `_v` entry to run a one-time upgrade.
// Every operation announces itself to listeners before the cache or backend
// is touched.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::backend::{Backend, BackendKind, LocalStorageArea};
use crate::config::StoreConfig;
use crate::error::{Result, StorageError};
use crate::event::{ClearRequest, Entry, EventKind, Listeners, Removal, StorageEvent, UnknownEvent};
use crate::host::{HostEnvironment, ManagedHost};
use crate::version::StoreVersion;

/// Reserved entry holding the last applied encoded version.
pub const VERSION_KEY: &str = "_v";

/// Value written and read back when probing a local area.
const PROBE_SENTINEL: &str = "_OK_";

/// One-time data migration run when the store's version is newer than the
/// persisted one.
pub type UpgradeFn = Box<dyn FnOnce(&mut VersionedStore) -> Result<()>>;

/// Builder for [`VersionedStore`].
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use xel_storage::{HostEnvironment, InMemoryArea, StoreConfig, VersionedStore};
///
/// let host = HostEnvironment::new("example.org").with_local(InMemoryArea::new());
/// let mut store = VersionedStore::builder(&host)
///     .version("1.2.0")
///     .config(StoreConfig::default())
///     .on_upgrade(|store| {
///         store.set("greeting", json!("hello"))?;
///         Ok(())
///     })
///     .open()
///     .unwrap();
///
/// assert_eq!(store.get("greeting").unwrap(), Some(json!("hello")));
/// ```
pub struct StoreBuilder<'h> {
    host: &'h HostEnvironment,
    version: StoreVersion,
    config: StoreConfig,
    upgrade: Option<UpgradeFn>,
}

impl<'h> StoreBuilder<'h> {
    /// Set the data version. Defaults to `1`.
    pub fn version(mut self, version: impl Into<StoreVersion>) -> Self {
        self.version = version.into();
        self
    }

    /// Set backend selection options.
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Register the upgrade callback. An error returned from it fails
    /// [`StoreBuilder::open`].
    pub fn on_upgrade<F>(mut self, upgrade: F) -> Self
    where
        F: FnOnce(&mut VersionedStore) -> Result<()> + 'static,
    {
        self.upgrade = Some(Box::new(upgrade));
        self
    }

    /// Select a backend, reconcile versions and return the store.
    pub fn open(self) -> Result<VersionedStore> {
        let backend = select_backend(self.host, &self.config)?;
        info!(
            backend = %backend.kind(),
            host = %self.host.hostname(),
            "storage backend selected"
        );

        let mut store = VersionedStore {
            backend,
            version: self.version.encode(),
            cache: HashMap::new(),
            listeners: Listeners::new(),
        };

        let previous = store.backend.read(VERSION_KEY)?;
        let persisted = decode_version(previous.as_deref());
        if store.version > persisted {
            info!(from = persisted, to = store.version, "upgrading stored data");
            store.persist_version()?;
            if let Some(upgrade) = self.upgrade {
                if let Err(e) = upgrade(&mut store) {
                    warn!(error = %e, "upgrade failed; restoring previous version marker");
                    store.restore_version(previous.as_deref());
                    return Err(e);
                }
            }
        } else {
            debug!(persisted, current = store.version, "stored data is up to date");
        }

        Ok(store)
    }
}

fn select_backend(host: &HostEnvironment, config: &StoreConfig) -> Result<Backend> {
    match config.backend_kind() {
        BackendKind::Local => probe_local(host).map(Backend::Local),
        BackendKind::Managed => probe_managed(host).map(Backend::Managed),
    }
}

/// Write, read back and delete a uniquely named entry.
fn probe_local(host: &HostEnvironment) -> Result<Arc<dyn LocalStorageArea>> {
    let Some(area) = host.local() else {
        return Err(StorageError::Unsupported("storage API is unsupported".to_string()));
    };

    let probe_key = probe_key(host.hostname(), Utc::now().timestamp_millis());
    trace!(key = %probe_key, area = area.name(), "probing local storage");

    let round_trip = || -> Result<bool> {
        area.set_item(&probe_key, PROBE_SENTINEL)?;
        let matches = area.get_item(&probe_key)?.as_deref() == Some(PROBE_SENTINEL);
        area.remove_item(&probe_key)?;
        Ok(matches)
    };

    match round_trip() {
        Ok(true) => Ok(Arc::clone(area)),
        Ok(false) => Err(StorageError::Unavailable("storage is unavailable".to_string())),
        Err(e) => Err(StorageError::Unsupported(format!(
            "storage API is unsupported, or blocked by privacy settings: {e}"
        ))),
    }
}

/// Only the first dot of the hostname is replaced.
fn probe_key(hostname: &str, millis: i64) -> String {
    format!("test_{}_{millis}", hostname.replacen('.', "-", 1))
}

/// Decode a persisted version marker. Absent or non-numeric markers read as 0.
fn decode_version(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };
    match raw.trim().trim_matches('"').parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            warn!(raw = %raw, "persisted version is not a number; treating as 0");
            0.0
        }
    }
}

fn probe_managed(host: &HostEnvironment) -> Result<Arc<ManagedHost>> {
    match host.managed() {
        Some(managed) if managed.is_usable() => {
            if !managed.can_list() {
                warn!("managed host cannot list keys; clear() will only reset the cache");
            }
            Ok(Arc::clone(managed))
        }
        _ => Err(StorageError::Unavailable(
            "managed storage is disabled or unavailable".to_string(),
        )),
    }
}

fn check_key(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StorageError::InvalidKey(name.to_string()));
    }
    Ok(())
}

/// A key/value store over one selected backend, with caching, versioning
/// and event hooks.
///
/// Values are arbitrary JSON. A JSON `null` is treated as "no value": it is
/// never cached, and writing it deletes the entry.
pub struct VersionedStore {
    backend: Backend,
    version: f64,
    cache: HashMap<String, Value>,
    listeners: Listeners,
}

impl VersionedStore {
    /// Start building a store over `host`.
    pub fn builder(host: &HostEnvironment) -> StoreBuilder<'_> {
        StoreBuilder {
            host,
            version: StoreVersion::default(),
            config: StoreConfig::default(),
            upgrade: None,
        }
    }

    /// Open a store without an upgrade callback.
    pub fn open(
        host: &HostEnvironment,
        version: impl Into<StoreVersion>,
        config: StoreConfig,
    ) -> Result<Self> {
        Self::builder(host).version(version).config(config).open()
    }

    /// The encoded version this store was opened with.
    pub fn version(&self) -> f64 {
        self.version
    }

    /// Which backend arm was selected.
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Number of entries currently held in the cache.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn persist_version(&self) -> Result<()> {
        let text = serde_json::to_string(&self.version)
            .map_err(|e| StorageError::Write(e.to_string()))?;
        self.backend.write(VERSION_KEY, &text)
    }

    /// Put back the marker seen before a failed upgrade, so the next open
    /// retries it.
    fn restore_version(&self, previous: Option<&str>) {
        let restored = match previous {
            Some(raw) => self.backend.write(VERSION_KEY, raw),
            None => self.backend.remove(VERSION_KEY),
        };
        if let Err(e) = restored {
            warn!(error = %e, "could not restore version marker");
        }
    }

    /// True if `name` holds a value. Never fails: any error reads as `false`.
    pub fn has(&mut self, name: &str) -> bool {
        if self.cache.contains_key(name) {
            return true;
        }
        matches!(self.get(name), Ok(Some(_)))
    }

    /// Read `name`.
    ///
    /// A cached value is returned without touching the backend or emitting
    /// an event. Otherwise the raw text is decoded, offered to `read`
    /// listeners, cached if still non-null, and returned.
    pub fn get(&mut self, name: &str) -> Result<Option<Value>> {
        check_key(name)?;

        if let Some(value) = self.cache.get(name) {
            trace!(key = name, "cache hit");
            return Ok(Some(value.clone()));
        }

        let raw = self
            .backend
            .read(name)
            .map_err(|e| StorageError::Read(e.to_string()))?;
        let value = match raw {
            Some(text) => Some(
                serde_json::from_str::<Value>(&text)
                    .map_err(|e| StorageError::Read(format!("{name}: {e}")))?,
            ),
            None => None,
        };
        debug!(key = name, found = value.is_some(), "read from backend");

        let mut entry = Entry {
            name: name.to_string(),
            value,
        };
        self.listeners.emit(&mut StorageEvent::Read(&mut entry));

        if !entry.has_value() {
            return Ok(None);
        }
        let value = entry.value.unwrap_or(Value::Null);
        self.cache.insert(name.to_string(), value.clone());
        Ok(Some(value))
    }

    /// Read `name` and convert it into `T`.
    pub fn get_as<T: DeserializeOwned>(&mut self, name: &str) -> Result<Option<T>> {
        match self.get(name)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StorageError::Read(format!("{name}: {e}"))),
            None => Ok(None),
        }
    }

    /// Write `value` under `name`.
    ///
    /// `write` listeners may rewrite the value first. If the final value is
    /// absent or `null`, the call becomes [`VersionedStore::delete`].
    pub fn set(&mut self, name: &str, value: impl Into<Option<Value>>) -> Result<&mut Self> {
        check_key(name)?;

        let mut entry = Entry {
            name: name.to_string(),
            value: value.into(),
        };
        self.listeners.emit(&mut StorageEvent::Write(&mut entry));

        if !entry.has_value() {
            self.delete(name)
                .map_err(|e| StorageError::Write(e.to_string()))?;
            return Ok(self);
        }

        let value = entry.value.unwrap_or(Value::Null);
        let text = serde_json::to_string(&value)
            .map_err(|e| StorageError::Write(format!("{name}: {e}")))?;
        self.backend
            .write(name, &text)
            .map_err(|e| StorageError::Write(e.to_string()))?;
        debug!(key = name, bytes = text.len(), "wrote to backend");
        self.cache.insert(name.to_string(), value);

        Ok(self)
    }

    /// Serialize `value` and write it under `name`.
    pub fn set_as<T: Serialize>(&mut self, name: &str, value: &T) -> Result<&mut Self> {
        let value = serde_json::to_value(value)
            .map_err(|e| StorageError::Write(format!("{name}: {e}")))?;
        self.set(name, value)
    }

    /// Remove `name`, unless a `delete` listener vetoes it.
    ///
    /// Backend failures are returned as-is.
    pub fn delete(&mut self, name: &str) -> Result<&mut Self> {
        check_key(name)?;

        let mut removal = Removal {
            name: name.to_string(),
            process: true,
        };
        self.listeners.emit(&mut StorageEvent::Delete(&mut removal));

        if removal.process {
            self.cache.remove(name);
            self.backend.remove(name)?;
            debug!(key = name, "removed");
        } else {
            debug!(key = name, "removal vetoed by listener");
        }

        Ok(self)
    }

    /// Alias of [`VersionedStore::delete`].
    pub fn remove(&mut self, name: &str) -> Result<&mut Self> {
        self.delete(name)
    }

    /// Remove every entry, unless a `clear` listener vetoes it, then mark
    /// the store as up to date.
    pub fn clear(&mut self) -> Result<&mut Self> {
        let mut request = ClearRequest { process: true };
        self.listeners.emit(&mut StorageEvent::Clear(&mut request));

        if request.process {
            self.cache.clear();
            self.backend.clear()?;
            self.persist_version()?;
            info!(version = self.version, "storage cleared");
        } else {
            debug!("clear vetoed by listener");
        }

        Ok(self)
    }

    /// Append a listener for `kind`. Listeners cannot be removed.
    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> &mut Self
    where
        F: FnMut(&mut StorageEvent<'_>) + 'static,
    {
        self.listeners.add(kind, Box::new(listener));
        self
    }

    /// Append a listener by event name (`"read"`, `"write"`, `"delete"`,
    /// `"remove"` or `"clear"`).
    pub fn add_event_listener<F>(
        &mut self,
        name: &str,
        listener: F,
    ) -> std::result::Result<&mut Self, UnknownEvent>
    where
        F: FnMut(&mut StorageEvent<'_>) + 'static,
    {
        let kind = name.parse::<EventKind>()?;
        Ok(self.on(kind, listener))
    }
}

impl fmt::Debug for VersionedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedStore")
            .field("backend", &self.backend)
            .field("version", &self.version)
            .field("cached", &self.cache.len())
            .field("listeners", &self.listeners)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryArea;
    use crate::metrics::MeteredArea;
    use serde_json::json;

    fn local_host() -> (HostEnvironment, InMemoryArea) {
        let area = InMemoryArea::new();
        let host = HostEnvironment::new("example.org").with_local(area.clone());
        (host, area)
    }

    #[test]
    fn test_open_selects_local_by_default() {
        let (host, area) = local_host();
        let store = VersionedStore::open(&host, 1u32, StoreConfig::default()).unwrap();
        assert_eq!(store.backend_kind(), BackendKind::Local);
        assert_eq!(store.version(), 1.0);
        // Probe entry is gone, only the version marker remains.
        assert_eq!(area.keys(), vec![VERSION_KEY.to_string()]);
        assert_eq!(area.get_item(VERSION_KEY).unwrap(), Some("1.0".to_string()));
    }

    #[test]
    fn test_probe_key_replaces_first_dot_only() {
        assert_eq!(probe_key("www.example.org", 42), "test_www-example.org_42");
        assert_eq!(probe_key("localhost", 7), "test_localhost_7");
    }

    #[test]
    fn test_decode_version_marker() {
        assert_eq!(decode_version(None), 0.0);
        assert_eq!(decode_version(Some("2.5")), 2.5);
        assert_eq!(decode_version(Some("\"3\"")), 3.0);
        assert_eq!(decode_version(Some("null")), 0.0);
        assert_eq!(decode_version(Some("inf")), 0.0);
    }

    #[test]
    fn test_missing_local_is_unsupported() {
        let host = HostEnvironment::new("example.org");
        let err = VersionedStore::open(&host, 1u32, StoreConfig::default()).unwrap_err();
        assert!(matches!(err, StorageError::Unsupported(_)));
    }

    #[test]
    fn test_managed_context_does_not_fall_back_to_local() {
        let (host, _area) = local_host();
        let err = VersionedStore::open(&host, 1u32, StoreConfig::managed()).unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }

    #[test]
    fn test_managed_backend_selected() {
        let area = InMemoryArea::new();
        let host = HostEnvironment::new("example.org").with_managed(ManagedHost::over_area(area.clone()));
        let mut store = VersionedStore::open(&host, "1.0.0", StoreConfig::managed()).unwrap();
        assert_eq!(store.backend_kind(), BackendKind::Managed);

        store.set("k", json!([1, 2])).unwrap();
        assert_eq!(area.get_item("k").unwrap(), Some("[1,2]".to_string()));
    }

    #[test]
    fn test_cache_hit_skips_backend() {
        let metered = MeteredArea::new(InMemoryArea::new());
        let host = HostEnvironment::new("example.org").with_local(metered.clone());
        let mut store = VersionedStore::open(&host, 1u32, StoreConfig::default()).unwrap();

        store.set("k", json!({"a": 1})).unwrap();
        metered.reset_stats();

        for _ in 0..3 {
            assert_eq!(store.get("k").unwrap(), Some(json!({"a": 1})));
        }
        assert_eq!(metered.stats().get_count, 0);
    }

    #[test]
    fn test_null_is_not_cached() {
        let (host, area) = local_host();
        let mut store = VersionedStore::open(&host, 1u32, StoreConfig::default()).unwrap();

        area.set_item("n", "null").unwrap();
        assert_eq!(store.get("n").unwrap(), None);
        assert_eq!(store.cached_len(), 0);
    }

    #[test]
    fn test_set_null_deletes() {
        let (host, area) = local_host();
        let mut store = VersionedStore::open(&host, 1u32, StoreConfig::default()).unwrap();

        store.set("k", json!(1)).unwrap();
        store.set("k", Value::Null).unwrap();
        assert_eq!(area.get_item("k").unwrap(), None);
        assert!(!store.has("k"));
    }

    #[test]
    fn test_empty_key_rejected() {
        let (host, _area) = local_host();
        let mut store = VersionedStore::open(&host, 1u32, StoreConfig::default()).unwrap();

        assert!(matches!(store.get(""), Err(StorageError::InvalidKey(_))));
        assert!(matches!(store.set("", json!(1)), Err(StorageError::InvalidKey(_))));
        assert!(!store.has(""));
    }

    #[test]
    fn test_corrupt_value_is_read_error() {
        let (host, area) = local_host();
        let mut store = VersionedStore::open(&host, 1u32, StoreConfig::default()).unwrap();

        area.set_item("broken", "{not json").unwrap();
        match store.get("broken") {
            Err(StorageError::Read(msg)) => assert!(msg.contains("broken")),
            other => panic!("expected read error, got {other:?}"),
        }
        assert!(!store.has("broken"));
    }

    #[test]
    fn test_typed_round_trip() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Prefs {
            theme: String,
            font_size: u8,
        }

        let (host, _area) = local_host();
        let mut store = VersionedStore::open(&host, 1u32, StoreConfig::default()).unwrap();
        let prefs = Prefs {
            theme: "dark".to_string(),
            font_size: 14,
        };

        store.set_as("prefs", &prefs).unwrap();
        assert_eq!(store.get_as::<Prefs>("prefs").unwrap(), Some(prefs));
        assert!(matches!(store.get_as::<u32>("prefs"), Err(StorageError::Read(_))));
        assert_eq!(store.get_as::<Prefs>("absent").unwrap(), None);
    }

    #[test]
    fn test_unknown_event_name() {
        let (host, _area) = local_host();
        let mut store = VersionedStore::open(&host, 1u32, StoreConfig::default()).unwrap();

        assert!(store.add_event_listener("remove", |_| {}).is_ok());
        assert!(store.add_event_listener("flush", |_| {}).is_err());
    }

    #[test]
    fn test_chaining() {
        let (host, area) = local_host();
        let mut store = VersionedStore::open(&host, 1u32, StoreConfig::default()).unwrap();

        store
            .set("a", json!(1))
            .unwrap()
            .set("b", json!(2))
            .unwrap()
            .remove("a")
            .unwrap();
        assert_eq!(area.get_item("a").unwrap(), None);
        assert_eq!(area.get_item("b").unwrap(), Some("2".to_string()));
    }
}
