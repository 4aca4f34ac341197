// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host capabilities injected into the facade.
//
// A store never looks up ambient globals. Whatever the surrounding runtime
// offers (a local store, a managed storage API, a host identifier) is handed
// over explicitly in a `HostEnvironment`.

use std::fmt;
use std::sync::Arc;

use crate::backend::LocalStorageArea;
use crate::error::StorageError;

type GetFn = dyn Fn(&str) -> Result<Option<String>, StorageError> + Send + Sync;
type SetFn = dyn Fn(&str, &str) -> Result<(), StorageError> + Send + Sync;
type DeleteFn = dyn Fn(&str) -> Result<(), StorageError> + Send + Sync;
type ListFn = dyn Fn() -> Result<Vec<String>, StorageError> + Send + Sync;

/// Storage primitives offered by a managing host runtime.
///
/// Every primitive is optional, because hosts differ in what they grant.
/// The managed backend is usable only when `get`, `set` and `delete` are all
/// present; `list` is needed to clear the backend.
#[derive(Default)]
pub struct ManagedHost {
    get: Option<Box<GetFn>>,
    set: Option<Box<SetFn>>,
    delete: Option<Box<DeleteFn>>,
    list: Option<Box<ListFn>>,
}

impl ManagedHost {
    /// A host with no primitives granted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant the read primitive.
    pub fn with_get<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<Option<String>, StorageError> + Send + Sync + 'static,
    {
        self.get = Some(Box::new(f));
        self
    }

    /// Grant the write primitive.
    pub fn with_set<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) -> Result<(), StorageError> + Send + Sync + 'static,
    {
        self.set = Some(Box::new(f));
        self
    }

    /// Grant the delete primitive.
    pub fn with_delete<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<(), StorageError> + Send + Sync + 'static,
    {
        self.delete = Some(Box::new(f));
        self
    }

    /// Grant the list-all-keys primitive.
    pub fn with_list<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<Vec<String>, StorageError> + Send + Sync + 'static,
    {
        self.list = Some(Box::new(f));
        self
    }

    /// A fully featured host whose primitives operate on an in-memory area.
    ///
    /// Handy for tests and for embedding the managed arm without a real host.
    pub fn over_area(area: crate::memory::InMemoryArea) -> Self {
        let (get_area, set_area, del_area, list_area) =
            (area.clone(), area.clone(), area.clone(), area);
        Self::new()
            .with_get(move |k| get_area.get_item(k))
            .with_set(move |k, v| set_area.set_item(k, v))
            .with_delete(move |k| del_area.remove_item(k))
            .with_list(move || Ok(list_area.keys()))
    }

    /// True when get, set and delete are all granted.
    pub fn is_usable(&self) -> bool {
        self.get.is_some() && self.set.is_some() && self.delete.is_some()
    }

    /// True when the list primitive is granted.
    pub fn can_list(&self) -> bool {
        self.list.is_some()
    }

    pub(crate) fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match &self.get {
            Some(f) => f(key),
            None => Err(missing("get")),
        }
    }

    pub(crate) fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match &self.set {
            Some(f) => f(key, value),
            None => Err(missing("set")),
        }
    }

    pub(crate) fn delete(&self, key: &str) -> Result<(), StorageError> {
        match &self.delete {
            Some(f) => f(key),
            None => Err(missing("delete")),
        }
    }

    /// `Ok(None)` when the host cannot enumerate its keys.
    pub(crate) fn list(&self) -> Result<Option<Vec<String>>, StorageError> {
        self.list.as_ref().map(|f| f()).transpose()
    }
}

fn missing(primitive: &str) -> StorageError {
    StorageError::Unsupported(format!("managed host does not provide `{primitive}`"))
}

impl fmt::Debug for ManagedHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedHost")
            .field("get", &self.get.is_some())
            .field("set", &self.set.is_some())
            .field("delete", &self.delete.is_some())
            .field("list", &self.list.is_some())
            .finish()
    }
}

/// Everything the surrounding runtime exposes to a store.
#[derive(Clone)]
pub struct HostEnvironment {
    hostname: String,
    local: Option<Arc<dyn LocalStorageArea>>,
    managed: Option<Arc<ManagedHost>>,
}

impl HostEnvironment {
    /// A host identified by `hostname`, with no storage granted yet.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            local: None,
            managed: None,
        }
    }

    /// Grant a local storage area.
    pub fn with_local<A: LocalStorageArea + 'static>(mut self, area: A) -> Self {
        self.local = Some(Arc::new(area));
        self
    }

    /// Grant a managed storage capability set.
    pub fn with_managed(mut self, host: ManagedHost) -> Self {
        self.managed = Some(Arc::new(host));
        self
    }

    /// The host identifier, used to name probe entries.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub(crate) fn local(&self) -> Option<&Arc<dyn LocalStorageArea>> {
        self.local.as_ref()
    }

    pub(crate) fn managed(&self) -> Option<&Arc<ManagedHost>> {
        self.managed.as_ref()
    }
}

impl fmt::Debug for HostEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostEnvironment")
            .field("hostname", &self.hostname)
            .field("local", &self.local.as_ref().map(|a| a.name().to_string()))
            .field("managed", &self.managed)
            .finish()
    }
}
