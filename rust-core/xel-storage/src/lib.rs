// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// XelStore: versioned key/value storage facade.
//
// A store picks one of two interchangeable backing stores at construction
// (a local persistent area, or a host-managed storage API), caches decoded
// JSON values in process, runs a one-time upgrade when its data version is
// newer than the persisted one, and lets listeners rewrite or veto reads,
// writes, deletes and clears.
//
// # Modules
//
// - [`store`] -- The `VersionedStore` facade and its builder.
// - [`backend`] -- The `LocalStorageArea` trait and the `Backend` variant.
// - [`host`] -- Injected host capabilities (`HostEnvironment`, `ManagedHost`).
// - [`event`] -- Event payloads and the listener registry.
// - [`version`] -- Dotted version encoding.
// - [`config`] -- Backend selection options.
// - [`error`] -- The `StorageError` enum.
// - [`memory`] -- An in-memory local area.
// - [`metrics`] -- A counting wrapper around any local area.
// - [`redb_backend`] -- A persistent single-file local area (feature
//   `redb-backend`).
//
// # Example
//
// ```rust
// use serde_json::json;
// use xel_storage::{HostEnvironment, InMemoryArea, StoreConfig, VersionedStore};
//
// let area = InMemoryArea::new();
// let host = HostEnvironment::new("example.org").with_local(area.clone());
//
// let mut store = VersionedStore::open(&host, "2.4.17", StoreConfig::default()).unwrap();
// store.set("user", json!({"name": "test"})).unwrap();
// assert_eq!(store.get("user").unwrap().unwrap()["name"], "test");
//
// // A second store over the same area sees the persisted value.
// let mut reopened = VersionedStore::open(&host, "2.4.17", StoreConfig::default()).unwrap();
// assert!(reopened.has("user"));
// ```

pub mod backend;
pub mod config;
pub mod error;
pub mod event;
pub mod host;
pub mod memory;
pub mod metrics;
pub mod store;
pub mod version;

#[cfg(feature = "redb-backend")]
pub mod redb_backend;

pub use backend::{Backend, BackendKind, LocalStorageArea};
pub use config::StoreConfig;
pub use error::{Result, StorageError};
pub use event::{ClearRequest, Entry, EventKind, Removal, StorageEvent, UnknownEvent};
pub use host::{HostEnvironment, ManagedHost};
pub use memory::InMemoryArea;
pub use metrics::{AreaStats, MeteredArea};
pub use store::{StoreBuilder, UpgradeFn, VersionedStore, VERSION_KEY};
pub use version::{encode_str, StoreVersion};

#[cfg(feature = "redb-backend")]
pub use redb_backend::RedbArea;
