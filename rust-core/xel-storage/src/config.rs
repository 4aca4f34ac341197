// SPDX-License-Identifier: PMPL-1.0-or-later
//! Store configuration.
//!
//! Defaults: local storage is used unless the managed backend is both
//! preferred and the store runs inside a managed context.

use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;
use crate::error::StorageError;

/// Backend selection options for a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Use the managed host's storage when running inside a managed context.
    pub prefer_managed_backend: bool,
    /// The store runs under a managing host (e.g. a userscript manager).
    pub is_managed_context: bool,
}

impl StoreConfig {
    /// Config for a store running inside a managed context that wants the
    /// host's storage.
    pub fn managed() -> Self {
        Self {
            prefer_managed_backend: true,
            is_managed_context: true,
        }
    }

    /// Parse a config from JSON text. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, StorageError> {
        serde_json::from_str(text)
            .map_err(|e| StorageError::Unavailable(format!("invalid store config: {e}")))
    }

    /// Which backend arm this config commits to.
    pub fn backend_kind(&self) -> BackendKind {
        if self.prefer_managed_backend && self.is_managed_context {
            BackendKind::Managed
        } else {
            BackendKind::Local
        }
    }
}
