//! JSON-file [`KnowledgeStore`].
//!
//! The whole store lives in one file. Every write serializes the new state to a sibling
//! temporary file and renames it over the original, so a crash leaves either the old or the new
//! contents on disk. The in-memory state is only updated once the rename succeeded.
//! [`KnowledgeStore::save_entries`] applies a whole batch in one such write.

use std::{
    fs,
    path::{Path, PathBuf},
};

use kb_document::{KnowledgeChunk, KnowledgeItem};
use parking_lot::RwLock;
use tracing::{debug, info};

use super::{KnowledgeStore, StoreState};
use crate::StoreError;

/// Store persisted to a single JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    /// Path of the store file.
    path: PathBuf,
    /// Current contents, mirrored on disk.
    state: RwLock<StoreState>,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let state = if path.exists() {
            let bytes = fs::read(path).map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            StoreState::default()
        };
        info!(
            path = %path.display(),
            items = state.items.len(),
            "opened knowledge store"
        );
        Ok(Self {
            path: path.to_path_buf(),
            state: RwLock::new(state),
        })
    }

    /// Returns the store file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy of the state, persists it, then publishes it.
    fn write<T>(&self, change: impl FnOnce(&mut StoreState) -> T) -> Result<T, StoreError> {
        let mut state = self.state.write();
        let mut next = state.clone();
        let out = change(&mut next);
        self.persist(&next)?;
        *state = next;
        Ok(out)
    }

    /// Writes `state` to disk via temp file and rename.
    fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let bytes = serde_json::to_vec_pretty(state).map_err(StoreError::Serialize)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        debug!(path = %self.path.display(), "persisted knowledge store");
        Ok(())
    }
}

impl KnowledgeStore for JsonFileStore {
    fn get_knowledge_item(&self, id: &str) -> Result<Option<KnowledgeItem>, StoreError> {
        Ok(self.state.read().items.get(id).cloned())
    }

    fn save_item(&self, item: &KnowledgeItem) -> Result<(), StoreError> {
        self.write(|state| state.save_item(item))
    }

    fn delete_item(&self, id: &str) -> Result<bool, StoreError> {
        if !self.state.read().items.contains_key(id) {
            return Ok(false);
        }
        self.write(|state| state.delete_item(id))
    }

    fn list_items(&self) -> Result<Vec<KnowledgeItem>, StoreError> {
        Ok(self.state.read().items.values().cloned().collect())
    }

    fn save_chunks(&self, item_id: &str, chunks: Vec<KnowledgeChunk>) -> Result<(), StoreError> {
        self.write(|state| state.save_chunks(item_id, chunks))
    }

    fn save_entries(
        &self,
        entries: Vec<(KnowledgeItem, Vec<KnowledgeChunk>)>,
    ) -> Result<(), StoreError> {
        let count = entries.len();
        self.write(|state| state.save_entries(entries))?;
        debug!(entries = count, "saved entries in one write");
        Ok(())
    }

    fn get_chunks_for_item(&self, item_id: &str) -> Result<Vec<KnowledgeChunk>, StoreError> {
        Ok(self.state.read().chunks_for(item_id))
    }

    fn get_adjacent_chunks(
        &self,
        item_id: &str,
        chunk_index: usize,
    ) -> Result<Vec<KnowledgeChunk>, StoreError> {
        Ok(self.state.read().adjacent(item_id, chunk_index))
    }
}

#[cfg(test)]
mod test {
    use kb_document::SourceType;
    use tempfile::TempDir;

    use super::*;
    use crate::store::test::exercise_store;

    #[test]
    fn file_store_contract() {
        let dir = TempDir::new().unwrap();
        exercise_store(&JsonFileStore::open(&dir.path().join("store.json")).unwrap());
    }

    #[test]
    fn contents_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let item = KnowledgeItem::with_id("n", "Note", "persisted", SourceType::Text).unwrap();
        {
            let store = JsonFileStore::open(&path).unwrap();
            store.save_item(&item).unwrap();
        }
        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get_knowledge_item("n").unwrap(), Some(item));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn failed_batch_leaves_state_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonFileStore::open(&path).unwrap();
        let kept = KnowledgeItem::with_id("kept", "Kept", "body", SourceType::Text).unwrap();
        store.save_item(&kept).unwrap();

        // A directory at the temp path makes the write fail.
        fs::create_dir(path.with_extension("json.tmp")).unwrap();
        let items: Vec<_> = ["a", "b"]
            .iter()
            .map(|id| {
                let item = KnowledgeItem::with_id(*id, "T", "body", SourceType::Text).unwrap();
                (item, Vec::new())
            })
            .collect();
        assert!(matches!(store.save_entries(items), Err(StoreError::Io { .. })));
        assert_eq!(store.list_items().unwrap(), vec![kept]);
    }

    #[test]
    fn batch_is_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let entries: Vec<_> = (0..5)
            .map(|i| {
                let item =
                    KnowledgeItem::with_id(format!("n{i}"), "Note", "body", SourceType::Text)
                        .unwrap();
                (item, Vec::new())
            })
            .collect();
        JsonFileStore::open(&path).unwrap().save_entries(entries).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.list_items().unwrap().len(), 5);
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonFileStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }
}
