//! Index status detection.
//!
//! Status is read without taking the writer lock, so it works while another process holds the
//! index open.

use std::path::Path;

use tantivy::{Index, directory::MmapDirectory};

use crate::location::chunk_index_directory;

/// Status of one keyword index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// No index exists.
    Missing,
    /// The index exists but holds no documents.
    Empty,
    /// The index holds this many documents.
    Ready(u64),
}

impl IndexStatus {
    /// Returns a human-readable description for display.
    pub fn description(&self) -> String {
        match self {
            Self::Missing => "missing".to_string(),
            Self::Empty => "empty".to_string(),
            Self::Ready(n) => format!("{n} documents"),
        }
    }

    /// Number of documents, zero unless ready.
    pub fn num_docs(&self) -> u64 {
        match self {
            Self::Ready(n) => *n,
            Self::Missing | Self::Empty => 0,
        }
    }
}

/// Statuses of the document and chunk indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStatuses {
    /// Document index status.
    pub documents: IndexStatus,
    /// Chunk index status.
    pub chunks: IndexStatus,
}

/// Detects the status of the index at `dir`.
pub fn detect_status(dir: &Path) -> IndexStatus {
    let Ok(directory) = MmapDirectory::open(dir) else {
        return IndexStatus::Missing;
    };
    if !Index::exists(&directory).unwrap_or(false) {
        return IndexStatus::Missing;
    }
    let count = Index::open(directory)
        .and_then(|index| index.reader())
        .map(|reader| reader.searcher().num_docs());
    match count {
        Ok(0) | Err(_) => IndexStatus::Empty,
        Ok(n) => IndexStatus::Ready(n),
    }
}

/// Detects the status of both indexes under a document index directory.
pub fn detect_index_statuses(index_dir: &Path) -> IndexStatuses {
    IndexStatuses {
        documents: detect_status(index_dir),
        chunks: detect_status(&chunk_index_directory(index_dir)),
    }
}
