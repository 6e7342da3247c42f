//! Tantivy keyword indexes for kb.
//!
//! Two indexes share one schema and one core:
//! - [`DocumentIndex`] matches whole items on title and content
//! - [`ChunkIndex`] matches chunks on heading and content
//!
//! Queries are OR-matched, case-insensitive, stemmed, and tolerant of substrings. Every write
//! is a single commit made under a writer lock, rolled back on failure.

#![warn(missing_docs)]

mod analyzer;
mod chunk;
mod document;
mod error;
mod keyword;
mod location;
mod schema;
mod status;
mod terms;

pub use analyzer::{
    KB_TOKENIZER, VOCABULARY_TOKENIZER, build_analyzer, build_analyzer_from_name,
    build_vocabulary_analyzer, parse_language,
};
pub use chunk::ChunkIndex;
pub use document::{DocumentIndex, KeywordHit};
pub use error::IndexError;
pub use location::{CHUNK_INDEX_DIR, chunk_index_directory, index_directory};
pub use schema::{KeywordSchema, boost};
pub use status::{IndexStatus, IndexStatuses, detect_index_statuses, detect_status};
pub use terms::{Segmenter, is_cjk, query_terms};
