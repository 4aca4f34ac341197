// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <j.d.a.jewell@open.ac.uk>
//
// redb-backed persistent local storage area.
//
// Uses redb (pure Rust, B-tree, ACID, single-file database) to give the
// facade a local store that survives process restarts, the way a browser's
// origin-scoped local store survives page reloads.
//
// # Design
//
// - Single redb `Database` file containing one `items` table of text pairs.
// - One read transaction per `get_item`.
// - One write transaction per `set_item`/`remove_item`/`clear`, committed
//   before returning. redb fsyncs on commit, so there is no flush step.
// - `clear` drops the whole table; it is recreated by the next write.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{Database, ReadableDatabase, TableDefinition, TableError};
use tracing::debug;

use crate::backend::LocalStorageArea;
use crate::error::StorageError;

const ITEMS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("items");

/// A persistent [`LocalStorageArea`] powered by redb.
///
/// # Example
///
/// ```rust,no_run
/// use xel_storage::backend::LocalStorageArea;
/// use xel_storage::redb_backend::RedbArea;
///
/// let area = RedbArea::open("/tmp/xelstore-test.redb").unwrap();
/// area.set_item("hello", "\"world\"").unwrap();
/// assert_eq!(area.get_item("hello").unwrap(), Some("\"world\"".to_string()));
/// ```
pub struct RedbArea {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbArea {
    /// Open or create a redb database at the given path.
    ///
    /// Creates parent directories if they don't exist. The items table is
    /// created on first write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::create(&path).map_err(|e| {
            StorageError::Unavailable(format!("failed to open redb at {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), "opened redb area");

        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    /// Filesystem path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All keys in the items table, in lexicographic order.
    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        use redb::ReadableTable;

        let txn = self
            .db
            .begin_read()
            .map_err(|e| StorageError::Backend(format!("read txn: {e}")))?;
        let table = match txn.open_table(ITEMS_TABLE) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Backend(format!("open table: {e}"))),
        };

        let mut keys = Vec::new();
        let iter = table
            .iter()
            .map_err(|e| StorageError::Backend(format!("iterate: {e}")))?;
        for entry in iter {
            let (key, _) = entry.map_err(|e| StorageError::Backend(format!("iterate entry: {e}")))?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }
}

impl std::fmt::Debug for RedbArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbArea").field("path", &self.path).finish()
    }
}

impl LocalStorageArea for RedbArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| StorageError::Backend(format!("read txn: {e}")))?;

        let table = match txn.open_table(ITEMS_TABLE) {
            Ok(t) => t,
            // Nothing has been written yet.
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(StorageError::Backend(format!("open table: {e}"))),
        };

        match table.get(key) {
            Ok(Some(value)) => Ok(Some(value.value().to_string())),
            Ok(None) => Ok(None),
            Err(e) => Err(StorageError::Backend(format!("get: {e}"))),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| StorageError::Backend(format!("write txn: {e}")))?;
        {
            let mut table = txn
                .open_table(ITEMS_TABLE)
                .map_err(|e| StorageError::Backend(format!("open table: {e}")))?;
            table
                .insert(key, value)
                .map_err(|e| StorageError::Backend(format!("insert: {e}")))?;
        }
        txn.commit()
            .map_err(|e| StorageError::Backend(format!("commit: {e}")))?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| StorageError::Backend(format!("write txn: {e}")))?;
        {
            let mut table = txn
                .open_table(ITEMS_TABLE)
                .map_err(|e| StorageError::Backend(format!("open table: {e}")))?;
            table
                .remove(key)
                .map_err(|e| StorageError::Backend(format!("remove: {e}")))?;
        }
        txn.commit()
            .map_err(|e| StorageError::Backend(format!("commit: {e}")))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| StorageError::Backend(format!("write txn: {e}")))?;
        txn.delete_table(ITEMS_TABLE)
            .map_err(|e| StorageError::Backend(format!("delete table: {e}")))?;
        txn.commit()
            .map_err(|e| StorageError::Backend(format!("commit: {e}")))?;
        debug!(path = %self.path.display(), "cleared redb area");
        Ok(())
    }

    fn name(&self) -> &str {
        "redb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Uses `tempdir()` rather than `NamedTempFile` so the file is not
    /// unlinked while redb still holds it open.
    fn temp_area() -> (RedbArea, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.redb");
        let area = RedbArea::open(&path).unwrap();
        (area, dir)
    }

    #[test]
    fn test_basic_crud() {
        let (area, _dir) = temp_area();

        assert_eq!(area.get_item("key1").unwrap(), None);

        area.set_item("key1", "value1").unwrap();
        assert_eq!(area.get_item("key1").unwrap(), Some("value1".to_string()));

        area.set_item("key1", "updated").unwrap();
        assert_eq!(area.get_item("key1").unwrap(), Some("updated".to_string()));

        area.remove_item("key1").unwrap();
        assert_eq!(area.get_item("key1").unwrap(), None);

        area.remove_item("nonexistent").unwrap();
    }

    #[test]
    fn test_clear_drops_everything() {
        let (area, _dir) = temp_area();
        area.set_item("a", "1").unwrap();
        area.set_item("b", "2").unwrap();
        assert_eq!(area.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);

        area.clear().unwrap();
        assert_eq!(area.get_item("a").unwrap(), None);
        assert!(area.keys().unwrap().is_empty());

        // The table comes back on the next write.
        area.set_item("c", "3").unwrap();
        assert_eq!(area.get_item("c").unwrap(), Some("3".to_string()));
    }

    #[test]
    fn test_clear_on_fresh_file() {
        let (area, _dir) = temp_area();
        area.clear().unwrap();
        assert!(area.keys().unwrap().is_empty());
    }

    #[test]
    fn test_name_and_path() {
        let (area, dir) = temp_area();
        assert_eq!(area.name(), "redb");
        assert_eq!(area.path(), dir.path().join("test.redb"));
    }

    #[test]
    fn test_unreadable_table_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mismatch.redb");

        {
            let db = Database::create(&path).unwrap();
            let txn = db.begin_write().unwrap();
            {
                let numbers: TableDefinition<u64, u64> = TableDefinition::new("items");
                let mut table = txn.open_table(numbers).unwrap();
                table.insert(1, 2).unwrap();
            }
            txn.commit().unwrap();
        }

        let area = RedbArea::open(&path).unwrap();
        assert!(matches!(area.get_item("_v"), Err(StorageError::Backend(_))));
        assert!(matches!(area.keys(), Err(StorageError::Backend(_))));
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("persist-test.redb");

        {
            let area = RedbArea::open(&path).unwrap();
            area.set_item("persistent-key", "42").unwrap();
        }

        {
            let area = RedbArea::open(&path).unwrap();
            assert_eq!(area.get_item("persistent-key").unwrap(), Some("42".to_string()));
        }
    }
}
