//! Data structures returned by search.

use std::collections::BTreeMap;

use kb_document::{KnowledgeChunk, KnowledgeItem};
use serde::{Deserialize, Serialize};

/// Provenance tag for keyword matches.
pub const FIELD_KEYWORD: &str = "keyword";

/// Provenance tag for semantic matches.
pub const FIELD_SEMANTIC: &str = "semantic";

/// Provenance tag for results assembled from chunk matches.
pub const FIELD_CHUNK: &str = "chunk";

/// A chunk attached to a search result.
///
/// Matched chunks carry a score; context chunks, pulled in as neighbours, do not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedChunk {
    /// Chunk id.
    pub id: String,
    /// Owning item id.
    pub item_id: String,
    /// Position within the item.
    pub chunk_index: usize,
    /// Nearest enclosing section title.
    pub heading: String,
    /// Chunk text, possibly truncated by the content budget.
    pub content: String,
    /// Byte offset of the chunk start in the item content.
    pub start_position: usize,
    /// Byte offset of the chunk end in the item content.
    pub end_position: usize,
    /// Relevance in `0.0..=1.0`; `None` for context chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl MatchedChunk {
    /// Projects a stored chunk with an optional score.
    pub fn from_chunk(chunk: KnowledgeChunk, score: Option<f32>) -> Self {
        Self {
            id: chunk.id,
            item_id: chunk.item_id,
            chunk_index: chunk.chunk_index,
            heading: chunk.heading,
            content: chunk.content,
            start_position: chunk.start_position,
            end_position: chunk.end_position,
            score,
        }
    }

    /// Content length in characters.
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// One item-level hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matched item. Its content may be capped.
    pub item: KnowledgeItem,
    /// Relevance in `0.0..=1.0`.
    pub relevance_score: f32,
    /// Provenance tags: `keyword`, `semantic`, `chunk`.
    pub matched_fields: Vec<String>,
    /// Reserved; always empty.
    #[serde(default)]
    pub highlights: Vec<String>,
    /// Best matching chunks, highest score first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_chunks: Vec<MatchedChunk>,
    /// Unscored neighbours of the matched chunks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_chunks: Vec<MatchedChunk>,
}

impl SearchResult {
    /// Creates a result with one provenance tag and no chunks.
    pub fn new(item: KnowledgeItem, relevance_score: f32, field: &str) -> Self {
        Self {
            item,
            relevance_score,
            matched_fields: vec![field.to_string()],
            highlights: Vec::new(),
            matched_chunks: Vec::new(),
            context_chunks: Vec::new(),
        }
    }

    /// Characters of item content plus all attached chunk content.
    pub fn content_size(&self) -> usize {
        self.item.content.chars().count()
            + self
                .matched_chunks
                .iter()
                .chain(&self.context_chunks)
                .map(MatchedChunk::content_len)
                .sum::<usize>()
    }
}

/// Which search path produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    /// Two-stage chunk search.
    Chunked,
    /// Whole-document search.
    Document,
}

impl SearchStrategy {
    /// Lowercase name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chunked => "chunked",
            Self::Document => "document",
        }
    }
}

/// Response envelope for one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// The query as given.
    pub query: String,
    /// Results in final order.
    pub results: Vec<SearchResult>,
    /// Number of results that passed the filters, before truncation.
    pub total_found: usize,
    /// Wall-clock duration of the search in milliseconds.
    pub search_time_ms: u64,
    /// Results grouped by category, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouped_results: Option<BTreeMap<String, Vec<SearchResult>>>,
    /// Path that produced the results.
    pub strategy: SearchStrategy,
}
