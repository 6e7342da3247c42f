//! The knowledge base context object.
//!
//! [`KnowledgeBase`] owns every index and the store, and keeps them consistent:
//! - ingestion chunks an item and writes it to both keyword indexes, both semantic indexes and
//!   the store
//! - updates re-chunk only when the chunk text can change
//! - deletes cascade from the item to its chunks everywhere
//!
//! Keyword indexes are written before the store. A keyword write failure leaves the store
//! untouched and fails the operation. A store failure restores the keyword entries the item had
//! before the write, then fails the operation.

use std::path::{Path, PathBuf};

use kb_config::Config;
use kb_document::{Chunker, ItemPatch, KnowledgeChunk, KnowledgeItem, chunk_item, load_item};
use kb_index::{ChunkIndex, DocumentIndex, chunk_index_directory, index_directory};
use kb_semantic::{ChunkSemanticIndex, DocumentSemanticIndex};
use serde::Serialize;
use tracing::{info, warn};

use crate::{KnowledgeStore, SearchEngine, SearchError, SearchOptions, SearchResult, SearchResults};

/// Counts describing the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnowledgeBaseStats {
    /// Items in the store.
    pub items: usize,
    /// Chunks in the store.
    pub chunks: usize,
    /// Documents in the document keyword index.
    pub indexed_documents: u64,
    /// Chunks in the chunk keyword index.
    pub indexed_chunks: u64,
    /// Whether the document semantic index is fitted.
    pub semantic_documents_fitted: bool,
    /// Whether the chunk semantic index is fitted.
    pub semantic_chunks_fitted: bool,
    /// Terms in the document semantic vocabulary.
    pub vocabulary_size: usize,
}

/// Counts from a rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RebuildStats {
    /// Items reindexed.
    pub items: usize,
    /// Chunks produced.
    pub chunks: usize,
}

/// Keyword index entries of one item taken before a write.
struct KeywordSnapshot {
    /// Item id.
    id: String,
    /// Stored item, `None` when the write adds a new item.
    item: Option<KnowledgeItem>,
    /// Stored chunks of the item.
    chunks: Vec<KnowledgeChunk>,
}

/// Indexes, store and settings for one knowledge base.
pub struct KnowledgeBase {
    /// Resolved configuration.
    config: Config,
    /// Splits item content into chunks.
    chunker: Chunker,
    /// Item and chunk storage.
    store: Box<dyn KnowledgeStore>,
    /// Whole-item keyword index.
    documents: DocumentIndex,
    /// Chunk keyword index.
    chunks: ChunkIndex,
    /// Whole-item semantic index.
    document_semantic: DocumentSemanticIndex,
    /// Chunk semantic index.
    chunk_semantic: ChunkSemanticIndex,
}

impl KnowledgeBase {
    /// Opens or creates the indexes and fits the semantic indexes from the store.
    ///
    /// Keyword indexes that are empty while the store holds items are rebuilt.
    pub fn open(config: Config, store: Box<dyn KnowledgeStore>) -> Result<Self, SearchError> {
        let index_dir = index_directory(&config);
        let documents = DocumentIndex::open(&index_dir, &config.index.stemmer)?;
        let chunks = ChunkIndex::open(&chunk_index_directory(&index_dir), &config.index.stemmer)?;

        let items = store.list_items()?;
        let stored_chunks = store.list_chunks()?;
        if !items.is_empty() && documents.num_docs() == 0 {
            info!(items = items.len(), "document index empty, rebuilding from store");
            documents.rebuild(&items)?;
        }
        if !stored_chunks.is_empty() && chunks.num_docs() == 0 {
            info!(chunks = stored_chunks.len(), "chunk index empty, rebuilding from store");
            chunks.rebuild(&stored_chunks)?;
        }

        let document_semantic = DocumentSemanticIndex::default();
        document_semantic.fit(items);
        let chunk_semantic = ChunkSemanticIndex::default();
        chunk_semantic.fit(stored_chunks);

        info!(
            index = %index_dir.display(),
            items = document_semantic.len(),
            chunks = chunk_semantic.len(),
            "opened knowledge base"
        );
        Ok(Self {
            chunker: Chunker::new(&config.chunking),
            config,
            store,
            documents,
            chunks,
            document_semantic,
            chunk_semantic,
        })
    }

    /// Closes the knowledge base, releasing the index writer locks.
    pub fn close(self) {
        info!(index = %self.index_dir().display(), "closed knowledge base");
    }

    /// The configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Document index directory.
    pub fn index_dir(&self) -> PathBuf {
        index_directory(&self.config)
    }

    /// The store.
    pub fn store(&self) -> &dyn KnowledgeStore {
        self.store.as_ref()
    }

    /// A search engine over this knowledge base.
    pub fn engine(&self) -> SearchEngine<'_> {
        SearchEngine::new(
            &self.documents,
            &self.document_semantic,
            &self.chunk_semantic,
            &self.config.search,
            &self.config.budget,
        )
        .with_chunk_index(&self.chunks)
        .with_store(self.store.as_ref())
    }

    /// Chunks, indexes and stores an item, replacing any item with the same id.
    pub fn add_item(&self, item: KnowledgeItem) -> Result<Vec<KnowledgeChunk>, SearchError> {
        item.validate()?;
        let chunks = chunk_item(&self.chunker, &item);
        let snapshots = vec![self.snapshot(&item.id)?];

        self.documents.update(&item)?;
        self.chunks.replace_for_item(&item.id, &chunks)?;
        self.save_or_restore(vec![(item.clone(), chunks.clone())], &snapshots)?;

        self.chunk_semantic
            .update_chunks_for_item(&item.id, chunks.clone());
        info!(item = %item.id, chunks = chunks.len(), "added item");
        self.document_semantic.update(item);
        Ok(chunks)
    }

    /// Adds several items with one document index commit, one store write and one semantic
    /// refit per index.
    pub fn add_items(&self, items: Vec<KnowledgeItem>) -> Result<usize, SearchError> {
        for item in &items {
            item.validate()?;
        }
        let chunk_sets: Vec<Vec<KnowledgeChunk>> = items
            .iter()
            .map(|item| chunk_item(&self.chunker, item))
            .collect();
        let snapshots = items
            .iter()
            .map(|item| self.snapshot(&item.id))
            .collect::<Result<Vec<_>, _>>()?;

        self.documents.update_many(&items)?;
        for (item, chunks) in items.iter().zip(&chunk_sets) {
            self.chunks.replace_for_item(&item.id, chunks)?;
        }
        let entries = items.iter().cloned().zip(chunk_sets.iter().cloned()).collect();
        self.save_or_restore(entries, &snapshots)?;

        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        self.chunk_semantic
            .update_chunks_for_items(&ids, chunk_sets.into_iter().flatten().collect());
        let count = items.len();
        self.document_semantic.update_many(items);
        info!(items = count, "added items");
        Ok(count)
    }

    /// Applies a partial update to a stored item.
    ///
    /// The item is re-chunked when its content or title changed, since the title heads
    /// unsectioned chunks.
    pub fn update_item(&self, id: &str, patch: ItemPatch) -> Result<KnowledgeItem, SearchError> {
        let snapshot = self.snapshot(id)?;
        let mut item = snapshot
            .item
            .clone()
            .ok_or_else(|| SearchError::ItemNotFound(id.to_string()))?;
        let old_title = item.title.clone();
        let content_changed = item.apply_patch(patch)?;
        let rechunk = content_changed || item.title != old_title;

        self.documents.update(&item)?;
        let chunks = if rechunk {
            let chunks = chunk_item(&self.chunker, &item);
            self.chunks.replace_for_item(&item.id, &chunks)?;
            chunks
        } else {
            snapshot.chunks.clone()
        };
        self.save_or_restore(vec![(item.clone(), chunks.clone())], &[snapshot])?;
        if rechunk {
            self.chunk_semantic.update_chunks_for_item(&item.id, chunks);
        }
        self.document_semantic.update(item.clone());
        info!(item = %item.id, rechunked = rechunk, "updated item");
        Ok(item)
    }

    /// Captures what the keyword indexes should hold for `id` if a write has to be undone.
    fn snapshot(&self, id: &str) -> Result<KeywordSnapshot, SearchError> {
        let item = self.store.get_knowledge_item(id)?;
        let chunks = if item.is_some() {
            self.store.get_chunks_for_item(id)?
        } else {
            Vec::new()
        };
        Ok(KeywordSnapshot {
            id: id.to_string(),
            item,
            chunks,
        })
    }

    /// Saves `entries` to the store, restoring the keyword indexes to `snapshots` on failure.
    fn save_or_restore(
        &self,
        entries: Vec<(KnowledgeItem, Vec<KnowledgeChunk>)>,
        snapshots: &[KeywordSnapshot],
    ) -> Result<(), SearchError> {
        let Err(e) = self.store.save_entries(entries) else {
            return Ok(());
        };
        warn!(error = %e, items = snapshots.len(), "store write failed, restoring keyword indexes");
        for snapshot in snapshots {
            if let Err(restore) = self.restore(snapshot) {
                warn!(item = %snapshot.id, error = %restore, "failed to restore keyword index");
            }
        }
        Err(e.into())
    }

    /// Puts the keyword entries of one item back to a snapshot.
    fn restore(&self, snapshot: &KeywordSnapshot) -> Result<(), SearchError> {
        match &snapshot.item {
            Some(item) => {
                self.documents.update(item)?;
                self.chunks.replace_for_item(&snapshot.id, &snapshot.chunks)?;
            }
            None => {
                self.documents.remove(&snapshot.id)?;
                self.chunks.remove_all_for_item(&snapshot.id)?;
            }
        }
        Ok(())
    }

    /// Deletes an item and its chunks everywhere. Returns whether the item was stored.
    pub fn delete_item(&self, id: &str) -> Result<bool, SearchError> {
        self.documents.remove(id)?;
        self.chunks.remove_all_for_item(id)?;
        let existed = self.store.delete_item(id)?;
        self.document_semantic.remove(id);
        self.chunk_semantic.remove_chunks_for_item(id);
        info!(item = %id, existed, "deleted item");
        Ok(existed)
    }

    /// Re-chunks every stored item and rebuilds all indexes from scratch.
    pub fn rebuild(&self) -> Result<RebuildStats, SearchError> {
        let items = self.store.list_items()?;
        let mut all_chunks = Vec::new();
        for item in &items {
            let chunks = chunk_item(&self.chunker, item);
            self.store.save_chunks(&item.id, chunks.clone())?;
            all_chunks.extend(chunks);
        }

        self.documents.rebuild(&items)?;
        self.chunks.rebuild(&all_chunks)?;

        let stats = RebuildStats {
            items: items.len(),
            chunks: all_chunks.len(),
        };
        self.document_semantic.fit(items);
        self.chunk_semantic.fit(all_chunks);
        info!(items = stats.items, chunks = stats.chunks, "rebuilt knowledge base");
        Ok(stats)
    }

    /// Extracts a file into an item and adds it.
    ///
    /// A file ingested again replaces the item previously ingested from the same path, keeping
    /// its id and creation time.
    pub fn ingest_path(&self, path: &Path) -> Result<KnowledgeItem, SearchError> {
        let mut item = load_item(path)?;
        let previous = self
            .store
            .list_items()?
            .into_iter()
            .find(|existing| existing.source_path == item.source_path);
        if let Some(previous) = previous {
            item.id = previous.id;
            item.created_at = previous.created_at;
        }
        self.add_item(item.clone())?;
        Ok(item)
    }

    /// Searches the knowledge base.
    pub fn search(&self, query: &str, options: &SearchOptions) -> SearchResults {
        self.engine().search(query, options)
    }

    /// Completions for a partial word, at most `limit`.
    pub fn suggest(&self, partial: &str, limit: usize) -> Vec<String> {
        self.engine().suggest(partial, limit)
    }

    /// Items semantically similar to the stored item `item_id`.
    pub fn find_similar(
        &self,
        item_id: &str,
        top_k: usize,
        min_similarity: f32,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let item = self
            .store
            .get_knowledge_item(item_id)?
            .ok_or_else(|| SearchError::ItemNotFound(item_id.to_string()))?;
        Ok(self.engine().find_similar(&item, top_k, min_similarity))
    }

    /// Counts across store and indexes.
    pub fn stats(&self) -> Result<KnowledgeBaseStats, SearchError> {
        Ok(KnowledgeBaseStats {
            items: self.store.list_items()?.len(),
            chunks: self.store.list_chunks()?.len(),
            indexed_documents: self.documents.num_docs(),
            indexed_chunks: self.chunks.num_docs(),
            semantic_documents_fitted: self.document_semantic.is_fitted(),
            semantic_chunks_fitted: self.chunk_semantic.is_fitted(),
            vocabulary_size: self.document_semantic.vocabulary_size(),
        })
    }
}

#[cfg(test)]
mod test {
    use std::{
        fs, io,
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
    };

    use kb_document::SourceType;
    use tempfile::TempDir;

    use super::*;
    use crate::{JsonFileStore, MemoryStore, StoreError};

    /// Memory store whose writes fail while `failing` is set.
    struct FlakyStore {
        /// Backing store.
        inner: MemoryStore,
        /// Shared failure switch.
        failing: Arc<AtomicBool>,
    }

    impl FlakyStore {
        fn new() -> (Self, Arc<AtomicBool>) {
            let failing = Arc::new(AtomicBool::new(false));
            let store = Self {
                inner: MemoryStore::new(),
                failing: Arc::clone(&failing),
            };
            (store, failing)
        }

        fn check(&self) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Io {
                    path: PathBuf::from("flaky"),
                    source: io::Error::other("disk full"),
                });
            }
            Ok(())
        }
    }

    impl KnowledgeStore for FlakyStore {
        fn get_knowledge_item(&self, id: &str) -> Result<Option<KnowledgeItem>, StoreError> {
            self.inner.get_knowledge_item(id)
        }
        fn save_item(&self, item: &KnowledgeItem) -> Result<(), StoreError> {
            self.check()?;
            self.inner.save_item(item)
        }
        fn delete_item(&self, id: &str) -> Result<bool, StoreError> {
            self.check()?;
            self.inner.delete_item(id)
        }
        fn list_items(&self) -> Result<Vec<KnowledgeItem>, StoreError> {
            self.inner.list_items()
        }
        fn save_chunks(
            &self,
            item_id: &str,
            chunks: Vec<KnowledgeChunk>,
        ) -> Result<(), StoreError> {
            self.check()?;
            self.inner.save_chunks(item_id, chunks)
        }
        fn get_chunks_for_item(&self, item_id: &str) -> Result<Vec<KnowledgeChunk>, StoreError> {
            self.inner.get_chunks_for_item(item_id)
        }
    }

    fn config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.index.path = dir.join("index");
        config.index.store = dir.join("store.json");
        config
    }

    fn item(id: &str, title: &str, content: &str) -> KnowledgeItem {
        KnowledgeItem::with_id(id, title, content, SourceType::Markdown).unwrap()
    }

    #[test]
    fn add_then_search() {
        let dir = TempDir::new().unwrap();
        let kb = KnowledgeBase::open(config(dir.path()), Box::new(MemoryStore::new())).unwrap();
        kb.add_item(item("tea", "Tea brewing", "Green tea wants cooler water."))
            .unwrap();

        let results = kb.search("tea", &SearchOptions::default());
        assert_eq!(results.results[0].item.id, "tea");
        assert_eq!(kb.store().get_chunks_for_item("tea").unwrap().len(), 1);
    }

    #[test]
    fn invalid_item_is_rejected() {
        let dir = TempDir::new().unwrap();
        let kb = KnowledgeBase::open(config(dir.path()), Box::new(MemoryStore::new())).unwrap();
        let mut bad = item("x", "X", "body");
        bad.content = "  ".into();
        assert!(matches!(kb.add_item(bad), Err(SearchError::Document(_))));
        assert_eq!(kb.stats().unwrap().items, 0);
    }

    #[test]
    fn store_failure_on_add_leaves_item_unsearchable() {
        let dir = TempDir::new().unwrap();
        let (store, failing) = FlakyStore::new();
        let kb = KnowledgeBase::open(config(dir.path()), Box::new(store)).unwrap();
        failing.store(true, Ordering::SeqCst);

        let err = kb
            .add_item(item("lost", "Glaciers", "Glaciers carve valleys slowly."))
            .unwrap_err();
        assert!(matches!(err, SearchError::Store(StoreError::Io { .. })));

        let stats = kb.stats().unwrap();
        assert_eq!(stats.items, 0);
        assert_eq!(stats.indexed_documents, 0);
        assert_eq!(stats.indexed_chunks, 0);
        let engine = kb.engine();
        assert!(engine.document_search("glaciers", &SearchOptions::default()).is_empty());
        assert!(kb.search("glaciers", &SearchOptions::default()).results.is_empty());
        assert!(kb.suggest("glac", 5).is_empty());
    }

    #[test]
    fn store_failure_on_batch_add_restores_previous_entries() {
        let dir = TempDir::new().unwrap();
        let (store, failing) = FlakyStore::new();
        let kb = KnowledgeBase::open(config(dir.path()), Box::new(store)).unwrap();
        kb.add_item(item("kept", "Deserts", "Dunes shift in the wind."))
            .unwrap();
        failing.store(true, Ordering::SeqCst);

        let result = kb.add_items(vec![
            item("kept", "Deserts", "Cacti store water."),
            item("new", "Reefs", "Corals build reefs."),
        ]);
        assert!(result.is_err());

        let stats = kb.stats().unwrap();
        assert_eq!(stats.indexed_documents, 1);
        assert_eq!(stats.indexed_chunks, 1);
        let options = SearchOptions::default();
        assert_eq!(kb.search("dunes", &options).results[0].item.id, "kept");
        assert!(kb.engine().document_search("cacti", &options).is_empty());
        assert!(kb.engine().document_search("corals", &options).is_empty());
    }

    #[test]
    fn store_failure_on_update_restores_previous_entry() {
        let dir = TempDir::new().unwrap();
        let (store, failing) = FlakyStore::new();
        let kb = KnowledgeBase::open(config(dir.path()), Box::new(store)).unwrap();
        kb.add_item(item("n", "Note", "Original words about comets."))
            .unwrap();
        failing.store(true, Ordering::SeqCst);

        let patch = ItemPatch {
            content: Some("Replacement about volcanoes.".into()),
            ..ItemPatch::default()
        };
        assert!(kb.update_item("n", patch).is_err());

        let options = SearchOptions::default();
        assert_eq!(kb.search("comets", &options).results[0].item.id, "n");
        assert!(kb.engine().document_search("volcanoes", &options).is_empty());
        assert_eq!(kb.stats().unwrap().indexed_chunks, 1);
    }

    #[test]
    fn update_rechunks_on_content_change() {
        let dir = TempDir::new().unwrap();
        let kb = KnowledgeBase::open(config(dir.path()), Box::new(MemoryStore::new())).unwrap();
        kb.add_item(item("n", "Note", "Original words.")).unwrap();

        let patch = ItemPatch {
            content: Some("Replacement about volcanoes.".into()),
            ..ItemPatch::default()
        };
        kb.update_item("n", patch).unwrap();

        let chunks = kb.store().get_chunks_for_item("n").unwrap();
        assert!(chunks[0].content.contains("volcanoes"));
        assert_eq!(kb.search("volcanoes", &SearchOptions::default()).results.len(), 1);
        assert!(kb.search("original", &SearchOptions::default()).results.is_empty());
    }

    #[test]
    fn update_missing_item_fails() {
        let dir = TempDir::new().unwrap();
        let kb = KnowledgeBase::open(config(dir.path()), Box::new(MemoryStore::new())).unwrap();
        let err = kb.update_item("nope", ItemPatch::default()).unwrap_err();
        assert!(matches!(err, SearchError::ItemNotFound(id) if id == "nope"));
    }

    #[test]
    fn delete_cascades() {
        let dir = TempDir::new().unwrap();
        let kb = KnowledgeBase::open(config(dir.path()), Box::new(MemoryStore::new())).unwrap();
        kb.add_item(item("gone", "Ephemeral", "Mayflies live briefly."))
            .unwrap();
        assert!(kb.delete_item("gone").unwrap());
        assert!(!kb.delete_item("gone").unwrap());

        let stats = kb.stats().unwrap();
        assert_eq!(stats.items, 0);
        assert_eq!(stats.chunks, 0);
        assert_eq!(stats.indexed_documents, 0);
        assert_eq!(stats.indexed_chunks, 0);
        assert!(kb.search("mayflies", &SearchOptions::default()).results.is_empty());
    }

    #[test]
    fn reopen_fits_from_store_and_rebuilds_missing_index() {
        let dir = TempDir::new().unwrap();
        let cfg = config(dir.path());
        {
            let store = JsonFileStore::open(&cfg.index.store).unwrap();
            let kb = KnowledgeBase::open(cfg.clone(), Box::new(store)).unwrap();
            kb.add_items(vec![
                item("a", "Alpha", "Kayaks glide across calm lakes."),
                item("b", "Beta", "Canoes glide across calm rivers."),
                item("c", "Gamma", "Sailboats need steady wind."),
            ])
            .unwrap();
            kb.close();
        }
        fs::remove_dir_all(&cfg.index.path).unwrap();

        let store = JsonFileStore::open(&cfg.index.store).unwrap();
        let kb = KnowledgeBase::open(cfg, Box::new(store)).unwrap();
        let stats = kb.stats().unwrap();
        assert_eq!(stats.items, 3);
        assert_eq!(stats.indexed_documents, 3);
        assert_eq!(stats.indexed_chunks, 3);
        assert_eq!(kb.search("kayaks", &SearchOptions::default()).results[0].item.id, "a");
    }

    #[test]
    fn ingest_same_path_replaces_item() {
        let dir = TempDir::new().unwrap();
        let kb = KnowledgeBase::open(config(dir.path()), Box::new(MemoryStore::new())).unwrap();
        let path = dir.path().join("note.md");
        fs::write(&path, "# Bees\n\nBees make honey.").unwrap();
        let first = kb.ingest_path(&path).unwrap();
        assert_eq!(first.title, "Bees");

        fs::write(&path, "# Bees\n\nBees pollinate flowers.").unwrap();
        let second = kb.ingest_path(&path).unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(kb.stats().unwrap().items, 1);
        assert!(kb.search("pollinate", &SearchOptions::default()).results.len() == 1);
    }

    #[test]
    fn rebuild_counts() {
        let dir = TempDir::new().unwrap();
        let kb = KnowledgeBase::open(config(dir.path()), Box::new(MemoryStore::new())).unwrap();
        kb.add_item(item("a", "A", "First note body.")).unwrap();
        kb.add_item(item("b", "B", "Second note body.")).unwrap();
        let stats = kb.rebuild().unwrap();
        assert_eq!(stats, RebuildStats { items: 2, chunks: 2 });
        assert_eq!(kb.stats().unwrap().indexed_chunks, 2);
    }

    #[test]
    fn find_similar_requires_known_item() {
        let dir = TempDir::new().unwrap();
        let kb = KnowledgeBase::open(config(dir.path()), Box::new(MemoryStore::new())).unwrap();
        assert!(matches!(
            kb.find_similar("ghost", 5, 0.0),
            Err(SearchError::ItemNotFound(_))
        ));
    }
}
