//! Chunked hybrid search for kb.
//!
//! This crate ties the keyword and semantic indexes together:
//! - [`SearchEngine`] runs two-stage chunk search with a whole-document fallback
//! - [`process`] filters, sorts, groups and truncates results
//! - [`ContentBudget`] caps the content a response carries
//! - [`KnowledgeBase`] owns indexes and storage and keeps them consistent on ingestion
//!
//! Storage is abstracted behind [`KnowledgeStore`], with in-memory and JSON-file backends.

#![warn(missing_docs)]

mod base;
mod budget;
mod engine;
mod error;
mod normalize;
mod options;
pub mod process;
mod store;
mod types;

pub use base::{KnowledgeBase, KnowledgeBaseStats, RebuildStats};
pub use budget::{ContentBudget, truncate_chars};
pub use engine::{ChunkSearchOutcome, SearchEngine};
pub use error::{OptionsError, SearchError, StoreError};
pub use normalize::{DEFAULT_DIVISOR, ScoreNormalizer};
pub use options::{DEFAULT_MAX_RESULTS, SearchOptions, SearchOptionsBuilder, SortBy};
pub use process::{Processed, UNCATEGORIZED, weighted_merge};
pub use store::{JsonFileStore, KnowledgeStore, MemoryStore, store_path};
pub use types::{
    FIELD_CHUNK, FIELD_KEYWORD, FIELD_SEMANTIC, MatchedChunk, SearchResult, SearchResults,
    SearchStrategy,
};
