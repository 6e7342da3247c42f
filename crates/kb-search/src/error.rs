//! Error types for the kb-search crate.

use std::{io, path::PathBuf};

use kb_document::DocumentError;
use kb_index::IndexError;
use thiserror::Error;

/// Errors raised by a [`KnowledgeStore`](crate::KnowledgeStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read or write the store file.
    #[error("store I/O error at {path}: {source}")]
    Io {
        /// Path of the store file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The store file exists but is not valid.
    #[error("failed to parse store {path}: {source}")]
    Parse {
        /// Path of the store file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Failed to serialize the store contents.
    #[error("failed to serialize store: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Invalid [`SearchOptions`](crate::SearchOptions).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptionsError {
    /// `max_results` was zero.
    #[error("max_results must be greater than zero")]
    ZeroMaxResults,

    /// `min_relevance` was outside `0.0..=1.0`.
    #[error("min_relevance must be between 0.0 and 1.0, got {0}")]
    MinRelevanceOutOfRange(f32),

    /// A category was both included and excluded.
    #[error("category `{0}` is both included and excluded")]
    ConflictingCategory(String),

    /// A tag was both included and excluded.
    #[error("tag `{0}` is both included and excluded")]
    ConflictingTag(String),
}

/// Errors surfaced by the knowledge base and search engine.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Item construction or extraction failed.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// A keyword index operation failed.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The storage backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Search options were invalid.
    #[error(transparent)]
    Options(#[from] OptionsError),

    /// No item with this id exists.
    #[error("no knowledge item with id `{0}`")]
    ItemNotFound(String),
}
