//! Storage collaborator for items and their chunks.
//!
//! The search engine reads items and neighbouring chunks through [`KnowledgeStore`]; the
//! knowledge base writes through it during ingestion. Two backends are provided:
//! - [`MemoryStore`]: maps behind a lock, for tests and embedding
//! - [`JsonFileStore`]: the same maps persisted to one JSON file

mod file;
mod memory;

use std::{collections::BTreeMap, path::PathBuf};

pub use file::JsonFileStore;
use kb_config::Config;
use kb_document::{KnowledgeChunk, KnowledgeItem};
pub use memory::MemoryStore;
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Path of the JSON item store, `[index] store` resolved against the config root.
pub fn store_path(config: &Config) -> PathBuf {
    config.resolve_path(&config.index.store)
}

/// Persistent storage for knowledge items and chunks.
///
/// Implementations must be safe to share across threads; every method takes `&self`.
pub trait KnowledgeStore: Send + Sync {
    /// Fetches an item by id.
    fn get_knowledge_item(&self, id: &str) -> Result<Option<KnowledgeItem>, StoreError>;

    /// Inserts or replaces an item.
    fn save_item(&self, item: &KnowledgeItem) -> Result<(), StoreError>;

    /// Deletes an item and all of its chunks. Returns whether the item existed.
    fn delete_item(&self, id: &str) -> Result<bool, StoreError>;

    /// Lists every stored item, ordered by id.
    fn list_items(&self) -> Result<Vec<KnowledgeItem>, StoreError>;

    /// Replaces the whole chunk set of `item_id`.
    fn save_chunks(&self, item_id: &str, chunks: Vec<KnowledgeChunk>) -> Result<(), StoreError>;

    /// Saves several items, each with its whole chunk set.
    ///
    /// Backends that persist on every write should override this to persist once.
    fn save_entries(
        &self,
        entries: Vec<(KnowledgeItem, Vec<KnowledgeChunk>)>,
    ) -> Result<(), StoreError> {
        for (item, chunks) in entries {
            self.save_item(&item)?;
            self.save_chunks(&item.id, chunks)?;
        }
        Ok(())
    }

    /// Returns the chunks of `item_id` ordered by chunk index.
    fn get_chunks_for_item(&self, item_id: &str) -> Result<Vec<KnowledgeChunk>, StoreError>;

    /// Returns the chunks directly before and after `chunk_index` in `item_id`.
    fn get_adjacent_chunks(
        &self,
        item_id: &str,
        chunk_index: usize,
    ) -> Result<Vec<KnowledgeChunk>, StoreError> {
        Ok(self
            .get_chunks_for_item(item_id)?
            .into_iter()
            .filter(|c| c.chunk_index.abs_diff(chunk_index) == 1)
            .collect())
    }

    /// Lists every stored chunk, grouped by item and ordered by chunk index.
    fn list_chunks(&self) -> Result<Vec<KnowledgeChunk>, StoreError> {
        let mut chunks = Vec::new();
        for item in self.list_items()? {
            chunks.extend(self.get_chunks_for_item(&item.id)?);
        }
        Ok(chunks)
    }
}

/// Contents shared by both backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    /// Items keyed by id.
    #[serde(default)]
    items: BTreeMap<String, KnowledgeItem>,
    /// Chunk sets keyed by owning item id, each ordered by chunk index.
    #[serde(default)]
    chunks: BTreeMap<String, Vec<KnowledgeChunk>>,
}

impl StoreState {
    /// Inserts or replaces an item.
    fn save_item(&mut self, item: &KnowledgeItem) {
        self.items.insert(item.id.clone(), item.clone());
    }

    /// Removes an item and its chunks.
    fn delete_item(&mut self, id: &str) -> bool {
        self.chunks.remove(id);
        self.items.remove(id).is_some()
    }

    /// Replaces the chunk set of an item. An empty set removes the entry.
    fn save_chunks(&mut self, item_id: &str, mut chunks: Vec<KnowledgeChunk>) {
        if chunks.is_empty() {
            self.chunks.remove(item_id);
            return;
        }
        chunks.sort_by_key(|c| c.chunk_index);
        self.chunks.insert(item_id.to_string(), chunks);
    }

    /// Inserts or replaces each item together with its chunk set.
    fn save_entries(&mut self, entries: Vec<(KnowledgeItem, Vec<KnowledgeChunk>)>) {
        for (item, chunks) in entries {
            self.save_item(&item);
            self.save_chunks(&item.id, chunks);
        }
    }

    /// Chunks of an item, ordered.
    fn chunks_for(&self, item_id: &str) -> Vec<KnowledgeChunk> {
        self.chunks.get(item_id).cloned().unwrap_or_default()
    }

    /// Neighbours of one chunk, found by position in the ordered set.
    fn adjacent(&self, item_id: &str, chunk_index: usize) -> Vec<KnowledgeChunk> {
        self.chunks
            .get(item_id)
            .map(|chunks| {
                chunks
                    .iter()
                    .filter(|c| c.chunk_index.abs_diff(chunk_index) == 1)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use kb_document::SourceType;

    use super::*;

    /// Runs the shared contract against any backend.
    pub(super) fn exercise_store(store: &dyn KnowledgeStore) {
        let item = KnowledgeItem::with_id("a", "Alpha", "alpha body", SourceType::Text).unwrap();
        store.save_item(&item).unwrap();
        assert_eq!(store.get_knowledge_item("a").unwrap(), Some(item.clone()));
        assert_eq!(store.get_knowledge_item("missing").unwrap(), None);

        let chunk = |i: usize| KnowledgeChunk {
            id: KnowledgeChunk::chunk_id("a", i),
            item_id: "a".into(),
            chunk_index: i,
            content: format!("part {i}"),
            heading: String::new(),
            start_position: i * 10,
            end_position: i * 10 + 6,
            metadata: serde_json::Map::new(),
        };
        store
            .save_chunks("a", vec![chunk(2), chunk(0), chunk(1), chunk(3)])
            .unwrap();
        let ordered: Vec<usize> = store
            .get_chunks_for_item("a")
            .unwrap()
            .iter()
            .map(|c| c.chunk_index)
            .collect();
        assert_eq!(ordered, vec![0, 1, 2, 3]);

        let adjacent: Vec<usize> = store
            .get_adjacent_chunks("a", 2)
            .unwrap()
            .iter()
            .map(|c| c.chunk_index)
            .collect();
        assert_eq!(adjacent, vec![1, 3]);
        assert_eq!(store.get_adjacent_chunks("a", 0).unwrap().len(), 1);

        store.save_chunks("a", vec![chunk(0)]).unwrap();
        assert_eq!(store.get_chunks_for_item("a").unwrap().len(), 1);
        assert_eq!(store.list_chunks().unwrap().len(), 1);

        assert!(store.delete_item("a").unwrap());
        assert!(!store.delete_item("a").unwrap());
        assert!(store.get_chunks_for_item("a").unwrap().is_empty());
        assert!(store.list_items().unwrap().is_empty());

        let b = KnowledgeItem::with_id("b", "Beta", "beta body", SourceType::Text).unwrap();
        let c = KnowledgeItem::with_id("c", "Gamma", "gamma body", SourceType::Text).unwrap();
        store
            .save_entries(vec![(b, vec![chunk(1), chunk(0)]), (c, Vec::new())])
            .unwrap();
        assert_eq!(store.list_items().unwrap().len(), 2);
        assert_eq!(store.get_chunks_for_item("b").unwrap()[0].chunk_index, 0);
        assert!(store.get_chunks_for_item("c").unwrap().is_empty());
    }

    #[test]
    fn store_path_resolves_against_config_root() {
        let mut config = Config {
            config_root: Some(PathBuf::from("/notes")),
            ..Default::default()
        };
        assert_eq!(store_path(&config), PathBuf::from("/notes/.kb/store.json"));
        config.index.store = PathBuf::from("/var/kb/items.json");
        assert_eq!(store_path(&config), PathBuf::from("/var/kb/items.json"));
    }

    #[test]
    fn state_serializes_round_trip() {
        let mut state = StoreState::default();
        let item = KnowledgeItem::with_id("x", "X", "body", SourceType::Markdown).unwrap();
        state.save_item(&item);
        let json = serde_json::to_string(&state).unwrap();
        let back: StoreState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.items.get("x"), Some(&item));
    }

    #[test]
    fn empty_chunk_set_removes_entry() {
        let mut state = StoreState::default();
        state.save_chunks("x", Vec::new());
        assert!(state.chunks.is_empty());
        assert!(state.adjacent("x", 0).is_empty());
    }
}
