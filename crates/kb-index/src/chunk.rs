//! Keyword index over chunks.

use std::{path::Path, sync::Arc};

use kb_document::KnowledgeChunk;
use tantivy::{Index, directory::MmapDirectory};

use crate::{
    IndexError, KeywordHit, Segmenter,
    document::decode_hits,
    keyword::{Change, IndexEntry, KeywordIndex},
};

/// Keyword index over [`KnowledgeChunk`]s, matching heading and content.
pub struct ChunkIndex {
    /// Shared index core.
    core: KeywordIndex,
}

impl ChunkIndex {
    /// Returns true if a chunk index exists in `dir`.
    pub fn has_index(dir: &Path) -> bool {
        MmapDirectory::open(dir)
            .ok()
            .and_then(|d| Index::exists(&d).ok())
            .unwrap_or(false)
    }

    /// Opens or creates the chunk index at `path`.
    pub fn open(path: &Path, language: &str) -> Result<Self, IndexError> {
        Ok(Self {
            core: KeywordIndex::open(path, language)?,
        })
    }

    /// Uses `segmenter` to split CJK query tokens.
    pub fn with_segmenter(mut self, segmenter: Arc<dyn Segmenter>) -> Self {
        self.core.set_segmenter(segmenter);
        self
    }

    /// Index directory.
    pub fn path(&self) -> &Path {
        self.core.path()
    }

    /// Returns true if the index holds any chunks to search.
    pub fn is_available(&self) -> bool {
        self.core.num_docs() > 0
    }

    /// Adds a chunk.
    pub fn add(&self, chunk: &KnowledgeChunk) -> Result<(), IndexError> {
        self.core.apply(vec![Change::Add(entry(chunk)?)])
    }

    /// Replaces a chunk (delete by id, then add).
    pub fn update(&self, chunk: &KnowledgeChunk) -> Result<(), IndexError> {
        self.core
            .apply(vec![Change::DeleteId(&chunk.id), Change::Add(entry(chunk)?)])
    }

    /// Removes a chunk by id.
    pub fn remove(&self, id: &str) -> Result<(), IndexError> {
        self.core.apply(vec![Change::DeleteId(id)])
    }

    /// Removes every chunk of an item.
    pub fn remove_all_for_item(&self, item_id: &str) -> Result<(), IndexError> {
        self.core.apply(vec![Change::DeleteOwner(item_id)])
    }

    /// Replaces every chunk of an item with `chunks` in one commit.
    pub fn replace_for_item(&self, item_id: &str, chunks: &[KnowledgeChunk]) -> Result<(), IndexError> {
        let mut changes = vec![Change::DeleteOwner(item_id)];
        for chunk in chunks {
            changes.push(Change::Add(entry(chunk)?));
        }
        self.core.apply(changes)
    }

    /// Replaces the whole index content with `chunks` in one commit.
    pub fn rebuild(&self, chunks: &[KnowledgeChunk]) -> Result<(), IndexError> {
        let mut changes = vec![Change::DeleteAll];
        for chunk in chunks {
            changes.push(Change::Add(entry(chunk)?));
        }
        self.core.apply(changes)
    }

    /// Finds chunks matching `query`, best first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<KeywordHit<KnowledgeChunk>> {
        decode_hits(self.core.search(query, limit))
    }

    /// Number of indexed chunks.
    pub fn num_docs(&self) -> u64 {
        self.core.num_docs()
    }
}

/// Builds the index entry for a chunk.
fn entry(chunk: &KnowledgeChunk) -> Result<IndexEntry, IndexError> {
    Ok(IndexEntry {
        id: chunk.id.clone(),
        owner: chunk.item_id.clone(),
        title: chunk.heading.clone(),
        content: chunk.content.clone(),
        vocabulary: false,
        payload: serde_json::to_string(chunk).map_err(|e| IndexError::write(&e))?,
    })
}
