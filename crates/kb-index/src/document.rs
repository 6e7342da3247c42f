//! Keyword index over whole items.

use std::{path::Path, sync::Arc};

use kb_document::KnowledgeItem;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::{
    IndexError, Segmenter,
    keyword::{Change, IndexEntry, KeywordIndex},
};

/// A keyword match with its raw, unnormalized score.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordHit<T> {
    /// The matched entity, rebuilt from the stored payload.
    pub entity: T,
    /// Raw Tantivy score.
    pub score: f32,
}

/// Keyword index over [`KnowledgeItem`]s, matching title and content.
pub struct DocumentIndex {
    /// Shared index core.
    core: KeywordIndex,
}

impl DocumentIndex {
    /// Opens or creates the document index at `path`.
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

    /// Adds an item.
    pub fn add(&self, item: &KnowledgeItem) -> Result<(), IndexError> {
        self.core.apply(vec![Change::Add(entry(item)?)])
    }

    /// Replaces an item (delete by id, then add).
    pub fn update(&self, item: &KnowledgeItem) -> Result<(), IndexError> {
        self.core
            .apply(vec![Change::DeleteId(&item.id), Change::Add(entry(item)?)])
    }

    /// Replaces several items in one commit.
    pub fn update_many(&self, items: &[KnowledgeItem]) -> Result<(), IndexError> {
        let mut changes = Vec::with_capacity(items.len() * 2);
        for item in items {
            changes.push(Change::DeleteId(&item.id));
            changes.push(Change::Add(entry(item)?));
        }
        self.core.apply(changes)
    }

    /// Removes an item by id.
    pub fn remove(&self, id: &str) -> Result<(), IndexError> {
        self.core.apply(vec![Change::DeleteId(id)])
    }

    /// Replaces the whole index content with `items` in one commit.
    pub fn rebuild(&self, items: &[KnowledgeItem]) -> Result<(), IndexError> {
        let mut changes = vec![Change::DeleteAll];
        for item in items {
            changes.push(Change::Add(entry(item)?));
        }
        self.core.apply(changes)
    }

    /// Finds items matching `query`, best first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<KeywordHit<KnowledgeItem>> {
        decode_hits(self.core.search(query, limit))
    }

    /// Indexed words starting with `prefix`, unstemmed and lowercase.
    pub fn vocabulary_prefix(&self, prefix: &str, limit: usize) -> Vec<String> {
        self.core.vocabulary_prefix(prefix, limit)
    }

    /// Number of indexed items.
    pub fn num_docs(&self) -> u64 {
        self.core.num_docs()
    }
}

/// Builds the index entry for an item.
fn entry(item: &KnowledgeItem) -> Result<IndexEntry, IndexError> {
    Ok(IndexEntry {
        id: item.id.clone(),
        owner: item.id.clone(),
        title: item.title.clone(),
        content: item.content.clone(),
        vocabulary: true,
        payload: serde_json::to_string(item).map_err(|e| IndexError::write(&e))?,
    })
}

/// Decodes stored payloads, skipping any that no longer parse.
pub(crate) fn decode_hits<T: DeserializeOwned>(raw: Vec<(String, f32)>) -> Vec<KeywordHit<T>> {
    raw.into_iter()
        .filter_map(|(payload, score)| match serde_json::from_str(&payload) {
            Ok(entity) => Some(KeywordHit { entity, score }),
            Err(e) => {
                warn!(error = %e, "skipping undecodable index payload");
                None
            }
        })
        .collect()
}
