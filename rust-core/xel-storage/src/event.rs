// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Store events and listener registry.
//
// Every event carries a mutable borrow of the in-flight operation's record.
// Listeners may rewrite a value (read/write) or clear the `process` flag to
// veto a removal (delete/clear). The store inspects the record after all
// listeners have run. Registration is append-only.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

/// A named value travelling through a `read` or `write`.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Entry name.
    pub name: String,
    /// Entry value. `None` or JSON `null` means "no value".
    pub value: Option<Value>,
}

impl Entry {
    /// True when the value is neither absent nor JSON `null`.
    pub fn has_value(&self) -> bool {
        matches!(&self.value, Some(v) if !v.is_null())
    }
}

/// A pending removal of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Entry name.
    pub name: String,
    /// Set to `false` to keep the entry.
    pub process: bool,
}

/// A pending clear of the whole store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearRequest {
    /// Set to `false` to keep the store's contents.
    pub process: bool,
}

/// Event names a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A value was loaded from the backend.
    Read,
    /// A value is about to be written.
    Write,
    /// An entry is about to be removed. Also subscribed to as `"remove"`.
    Delete,
    /// The store is about to be cleared.
    Clear,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Read => "read",
            EventKind::Write => "write",
            EventKind::Delete => "delete",
            EventKind::Clear => "clear",
        };
        f.write_str(name)
    }
}

/// Error returned when parsing an unknown event name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown storage event: {0:?}")]
pub struct UnknownEvent(pub String);

impl FromStr for EventKind {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(EventKind::Read),
            "write" => Ok(EventKind::Write),
            "delete" | "remove" => Ok(EventKind::Delete),
            "clear" => Ok(EventKind::Clear),
            other => Err(UnknownEvent(other.to_string())),
        }
    }
}

/// The payload handed to listeners.
#[derive(Debug)]
pub enum StorageEvent<'a> {
    /// See [`EventKind::Read`].
    Read(&'a mut Entry),
    /// See [`EventKind::Write`].
    Write(&'a mut Entry),
    /// See [`EventKind::Delete`].
    Delete(&'a mut Removal),
    /// See [`EventKind::Clear`].
    Clear(&'a mut ClearRequest),
}

impl StorageEvent<'_> {
    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            StorageEvent::Read(_) => EventKind::Read,
            StorageEvent::Write(_) => EventKind::Write,
            StorageEvent::Delete(_) => EventKind::Delete,
            StorageEvent::Clear(_) => EventKind::Clear,
        }
    }

    /// The entry of a read or write event.
    pub fn entry(&mut self) -> Option<&mut Entry> {
        match self {
            StorageEvent::Read(entry) | StorageEvent::Write(entry) => Some(&mut **entry),
            _ => None,
        }
    }

    /// Veto a delete or clear. No effect on read and write events.
    pub fn cancel(&mut self) {
        match self {
            StorageEvent::Delete(removal) => removal.process = false,
            StorageEvent::Clear(request) => request.process = false,
            StorageEvent::Read(_) | StorageEvent::Write(_) => {}
        }
    }
}

/// A registered event callback.
pub type Listener = Box<dyn FnMut(&mut StorageEvent<'_>)>;

/// Listeners per event kind, in registration order.
#[derive(Default)]
pub struct Listeners {
    by_kind: HashMap<EventKind, Vec<Listener>>,
}

impl Listeners {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener for `kind`. The same closure may be added twice.
    pub fn add(&mut self, kind: EventKind, listener: Listener) {
        self.by_kind.entry(kind).or_default().push(listener);
    }

    /// Run every listener for the event's kind, in registration order.
    pub fn emit(&mut self, event: &mut StorageEvent<'_>) {
        if let Some(listeners) = self.by_kind.get_mut(&event.kind()) {
            for listener in listeners.iter_mut() {
                listener(&mut *event);
            }
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<String, usize> = self
            .by_kind
            .iter()
            .map(|(kind, list)| (kind.to_string(), list.len()))
            .collect();
        f.debug_struct("Listeners").field("counts", &counts).finish()
    }
}
