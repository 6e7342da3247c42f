//! Semantic index over chunks, maintained per item.

use kb_document::KnowledgeChunk;

use crate::{SemanticIndex, TfIdfVectorizer};

/// Chunk-granularity semantic index.
///
/// Chunks are always replaced as a whole set per item, so an item never has a mix of old and
/// new chunks in a published fit.
#[derive(Debug, Default)]
pub struct ChunkSemanticIndex {
    /// Underlying index keyed by chunk id.
    inner: SemanticIndex<KnowledgeChunk>,
}

impl ChunkSemanticIndex {
    /// Creates an empty chunk index.
    pub fn new(vectorizer: TfIdfVectorizer) -> Self {
        Self {
            inner: SemanticIndex::new(vectorizer),
        }
    }

    /// Replaces the whole corpus with `chunks` and refits.
    pub fn fit(&self, chunks: impl IntoIterator<Item = KnowledgeChunk>) {
        self.inner.fit(chunks);
    }

    /// Replaces every chunk of `item_id` with `chunks` and refits once.
    pub fn update_chunks_for_item(&self, item_id: &str, chunks: Vec<KnowledgeChunk>) {
        self.inner
            .replace_where(|c| c.item_id == item_id, chunks);
    }

    /// Replaces the chunks of several items with `chunks` under a single refit.
    pub fn update_chunks_for_items(&self, item_ids: &[&str], chunks: Vec<KnowledgeChunk>) {
        self.inner
            .replace_where(|c| item_ids.contains(&c.item_id.as_str()), chunks);
    }

    /// Removes every chunk of `item_id` and refits. Returns the number of chunks removed.
    pub fn remove_chunks_for_item(&self, item_id: &str) -> usize {
        self.inner.remove_where(|c| c.item_id == item_id)
    }

    /// Finds chunks similar to `query`, best first.
    pub fn search(&self, query: &str, top_k: usize, min_similarity: f32) -> Vec<(KnowledgeChunk, f32)> {
        self.inner.search(query, top_k, min_similarity)
    }

    /// Returns true if a fitted table is published.
    pub fn is_fitted(&self) -> bool {
        self.inner.is_fitted()
    }

    /// Number of chunks in the corpus.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
