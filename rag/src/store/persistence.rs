//! redb-backed snapshot persistence for the in-memory store.

use std::fs;
use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable, TableDefinition};

use passaj_core::{Error, Result};

use super::StoredEntry;

const ENTRIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("chunks");

/// Saves and loads the full set of stored chunks in a redb file.
///
/// A save replaces the previous snapshot wholesale; rows are keyed by
/// chunk id and serialized with `serde_json`.
pub struct RedbSnapshot {
    path: PathBuf,
    db: Database,
}

impl std::fmt::Debug for RedbSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbSnapshot")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RedbSnapshot {
    /// Creates or opens a snapshot file.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let db = Database::create(&path).map_err(|e| Error::Storage(e.to_string()))?;
        Ok(Self { path, db })
    }

    /// Writes all entries, replacing any previous snapshot.
    pub fn save(&self, entries: &[StoredEntry]) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| Error::Storage(e.to_string()))?;

        write_txn
            .delete_table(ENTRIES_TABLE)
            .map_err(|e| Error::Storage(e.to_string()))?;

        {
            let mut table = write_txn
                .open_table(ENTRIES_TABLE)
                .map_err(|e| Error::Storage(e.to_string()))?;

            for entry in entries {
                let serialized = serde_json::to_vec(entry)
                    .map_err(|e| Error::Storage(e.to_string()))?;
                let key = entry.chunk.id.to_string();
                table
                    .insert(key.as_str(), serialized.as_slice())
                    .map_err(|e| Error::Storage(e.to_string()))?;
            }
        }

        write_txn
            .commit()
            .map_err(|e| Error::Storage(e.to_string()))?;
        Ok(())
    }

    /// Loads every entry; an empty or fresh file yields an empty vector.
    pub fn load(&self) -> Result<Vec<StoredEntry>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| Error::Storage(e.to_string()))?;

        let table = match read_txn.open_table(ENTRIES_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(Error::Storage(e.to_string())),
        };

        let mut entries = Vec::new();
        for row in table.iter().map_err(|e| Error::Storage(e.to_string()))? {
            let (_, value) = row.map_err(|e| Error::Storage(e.to_string()))?;
            let entry: StoredEntry = serde_json::from_slice(value.value())
                .map_err(|e| Error::Storage(e.to_string()))?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// The snapshot file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use tempfile::tempdir;
    use uuid::Uuid;

    use crate::types::{Chunk, ContentType};

    use super::*;

    fn entry(index: usize, content: &str) -> StoredEntry {
        StoredEntry::new(
            Chunk {
                id: Uuid::new_v4(),
                file_id: "f1".into(),
                chunk_index: index,
                content: content.into(),
                page_number: 1,
                start_page: 1,
                end_page: 1,
                section_title: None,
                content_type: ContentType::Text,
                contains_table: false,
                contains_list: false,
                image_references: BTreeSet::new(),
            },
            vec![1.0, 2.0],
        )
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let snapshot = RedbSnapshot::new(dir.path().join("index.redb")).unwrap();

        snapshot
            .save(&[entry(0, "hello"), entry(1, "world")])
            .unwrap();

        let loaded = snapshot.load().unwrap();
        assert_eq!(loaded.len(), 2);
        let contents: Vec<&str> = loaded.iter().map(|e| e.chunk.content.as_str()).collect();
        assert!(contents.contains(&"hello"));
        assert!(contents.contains(&"world"));
    }

    #[test]
    fn fresh_file_loads_empty() {
        let dir = tempdir().unwrap();
        let snapshot = RedbSnapshot::new(dir.path().join("empty.redb")).unwrap();
        assert!(snapshot.load().unwrap().is_empty());
    }

    #[test]
    fn save_replaces_previous_snapshot() {
        let dir = tempdir().unwrap();
        let snapshot = RedbSnapshot::new(dir.path().join("index.redb")).unwrap();

        snapshot
            .save(&[entry(0, "old"), entry(1, "older")])
            .unwrap();
        snapshot.save(&[entry(0, "new")]).unwrap();

        let loaded = snapshot.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].chunk.content, "new");
    }
}
