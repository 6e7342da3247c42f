//! In-memory [`KnowledgeStore`] for tests and embedding.

use kb_document::{KnowledgeChunk, KnowledgeItem};
use parking_lot::RwLock;

use super::{KnowledgeStore, StoreState};
use crate::StoreError;

/// Store that keeps everything in memory behind a read-write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Items and chunk sets.
    state: RwLock<StoreState>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KnowledgeStore for MemoryStore {
    fn get_knowledge_item(&self, id: &str) -> Result<Option<KnowledgeItem>, StoreError> {
        Ok(self.state.read().items.get(id).cloned())
    }

    fn save_item(&self, item: &KnowledgeItem) -> Result<(), StoreError> {
        self.state.write().save_item(item);
        Ok(())
    }

    fn delete_item(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.state.write().delete_item(id))
    }

    fn list_items(&self) -> Result<Vec<KnowledgeItem>, StoreError> {
        Ok(self.state.read().items.values().cloned().collect())
    }

    fn save_chunks(&self, item_id: &str, chunks: Vec<KnowledgeChunk>) -> Result<(), StoreError> {
        self.state.write().save_chunks(item_id, chunks);
        Ok(())
    }

    fn save_entries(
        &self,
        entries: Vec<(KnowledgeItem, Vec<KnowledgeChunk>)>,
    ) -> Result<(), StoreError> {
        self.state.write().save_entries(entries);
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
