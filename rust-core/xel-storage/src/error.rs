// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Storage error types for the XelStore facade.
//
// Construction failures are split between "the API is missing or throws"
// (`Unsupported`) and "nothing usable could be selected" (`Unavailable`).
// Runtime failures of `get` and `set` are wrapped with the underlying message
// embedded; raw backend failures surface as `Backend`.

use thiserror::Error;

/// Errors that can occur when constructing or using a storage facade.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested backend API does not exist in the host, or it threw
    /// while being probed.
    #[error("storage unsupported: {0}")]
    Unsupported(String),

    /// No usable backend could be selected for the store.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Reading or decoding a value failed.
    #[error("error reading data from storage: {0}")]
    Read(String),

    /// Encoding or writing a value failed.
    #[error("error writing data to storage: {0}")]
    Write(String),

    /// A backend primitive failed.
    #[error("backend error: {0}")]
    Backend(String),

    /// The entry name is not usable as a key.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// An I/O error occurred while opening a file-backed area.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = StorageError> = std::result::Result<T, E>;
