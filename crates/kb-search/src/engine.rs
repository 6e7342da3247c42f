//! Search orchestration.
//!
//! A query first goes through two-stage chunk search when both a populated chunk index and a
//! store are present:
//! 1. chunk keyword and semantic hits, merged per chunk by maximum score
//! 2. hits grouped per item, each item loaded from the store and given its best chunks plus
//!    their neighbours as context
//!
//! When chunk search is structurally unavailable or fails, the query runs as a whole-document
//! search: keyword and semantic hits over items, fused with a weighted merge.
//!
//! Both paths end in the same pipeline: filters, sort, grouping, truncation, budgets.

use std::{
    collections::{HashMap, HashSet},
    time::Instant,
};

use kb_config::{BudgetSettings, SearchSettings};
use kb_document::{KnowledgeChunk, KnowledgeItem};
use kb_index::{ChunkIndex, DocumentIndex, query_terms};
use kb_semantic::{ChunkSemanticIndex, DocumentSemanticIndex};
use tracing::{debug, warn};

use crate::{
    ContentBudget, FIELD_CHUNK, FIELD_KEYWORD, FIELD_SEMANTIC, KnowledgeStore, MatchedChunk,
    ScoreNormalizer, SearchError, SearchOptions, SearchResult, SearchResults, SearchStrategy,
    StoreError,
    process::{Processed, by_score_desc, process, weighted_merge},
};

/// Candidate multiplier for whole-document search.
const DOCUMENT_CANDIDATES: usize = 2;

/// Candidate multiplier for chunk search.
const CHUNK_CANDIDATES: usize = 3;

/// Result of attempting two-stage chunk search.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkSearchOutcome {
    /// No populated chunk index or no store; whole-document search should run instead.
    Unavailable,
    /// Chunk search ran; results are unprocessed.
    Completed(Vec<SearchResult>),
}

/// A chunk matched in stage 1.
#[derive(Debug, Clone)]
struct ChunkHit {
    /// The matched chunk.
    chunk: KnowledgeChunk,
    /// Best normalized score across sources.
    score: f32,
    /// Sources that matched the chunk.
    fields: Vec<&'static str>,
}

/// Runs searches over borrowed indexes and an optional store.
pub struct SearchEngine<'a> {
    /// Whole-item keyword index.
    documents: &'a DocumentIndex,
    /// Chunk keyword index, if opened.
    chunks: Option<&'a ChunkIndex>,
    /// Whole-item semantic index.
    document_semantic: &'a DocumentSemanticIndex,
    /// Chunk semantic index.
    chunk_semantic: &'a ChunkSemanticIndex,
    /// Item and chunk storage.
    store: Option<&'a dyn KnowledgeStore>,
    /// Weights and thresholds.
    settings: &'a SearchSettings,
    /// Response size limits.
    budget: ContentBudget,
    /// Keyword score normalization.
    normalizer: ScoreNormalizer,
}

impl<'a> SearchEngine<'a> {
    /// Creates an engine over the document-level indexes.
    pub fn new(
        documents: &'a DocumentIndex,
        document_semantic: &'a DocumentSemanticIndex,
        chunk_semantic: &'a ChunkSemanticIndex,
        settings: &'a SearchSettings,
        budget: &BudgetSettings,
    ) -> Self {
        Self {
            documents,
            chunks: None,
            document_semantic,
            chunk_semantic,
            store: None,
            settings,
            budget: ContentBudget::from_settings(budget),
            normalizer: ScoreNormalizer::from_settings(settings),
        }
    }

    /// Enables chunk search over `chunks`.
    pub fn with_chunk_index(mut self, chunks: &'a ChunkIndex) -> Self {
        self.chunks = Some(chunks);
        self
    }

    /// Attaches the store used to load items and context chunks.
    pub fn with_store(mut self, store: &'a dyn KnowledgeStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Returns true if a chunk index holding at least one chunk is attached.
    pub fn has_chunk_index(&self) -> bool {
        self.chunks.is_some_and(ChunkIndex::is_available)
    }

    /// Returns true if a store is attached.
    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Runs a search and wraps the results in a response envelope.
    pub fn search(&self, query: &str, options: &SearchOptions) -> SearchResults {
        let started = Instant::now();
        let (processed, strategy) = self.run(query, options);
        let search_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(
            query,
            results = processed.results.len(),
            total_found = processed.total_found,
            ?strategy,
            search_time_ms,
            "search finished"
        );
        SearchResults {
            query: query.to_string(),
            results: processed.results,
            total_found: processed.total_found,
            search_time_ms,
            grouped_results: processed.grouped,
            strategy,
        }
    }

    /// Chooses a path and produces processed results.
    fn run(&self, query: &str, options: &SearchOptions) -> (Processed, SearchStrategy) {
        if self.has_chunk_index() && self.has_store() {
            match self.chunk_search(query, options) {
                Ok(ChunkSearchOutcome::Completed(results)) => {
                    return (self.finish(results, options), SearchStrategy::Chunked);
                }
                Ok(ChunkSearchOutcome::Unavailable) => {
                    debug!("chunk search unavailable, searching whole documents");
                }
                Err(e) => {
                    warn!(error = %e, "chunk search failed, searching whole documents");
                }
            }
        }
        let results = self.document_search(query, options);
        (self.finish(results, options), SearchStrategy::Document)
    }

    /// Applies the processing pipeline and the budgets.
    fn finish(&self, results: Vec<SearchResult>, options: &SearchOptions) -> Processed {
        let mut processed = process(results, options);
        self.budget.apply(&mut processed);
        processed
    }

    /// Whole-document search: weighted keyword and semantic fusion over items.
    ///
    /// Results are projected for size but not yet filtered or budgeted.
    pub fn document_search(&self, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
        let limit = options.max_results().saturating_mul(DOCUMENT_CANDIDATES);

        let keyword: Vec<SearchResult> = self
            .documents
            .search(query, limit)
            .into_iter()
            .map(|hit| {
                SearchResult::new(hit.entity, self.normalizer.normalize(hit.score), FIELD_KEYWORD)
            })
            .collect();

        let semantic: Vec<SearchResult> = if self.document_semantic.is_fitted() {
            self.document_semantic
                .search(query, limit, self.settings.semantic_min_similarity)
                .into_iter()
                .map(|(item, score)| SearchResult::new(item, score, FIELD_SEMANTIC))
                .collect()
        } else {
            Vec::new()
        };

        debug!(
            query,
            keyword = keyword.len(),
            semantic = semantic.len(),
            "document search hits"
        );

        let merged = match (keyword.is_empty(), semantic.is_empty()) {
            (false, false) => weighted_merge(vec![
                (keyword, self.settings.keyword_weight),
                (semantic, self.settings.semantic_weight),
            ]),
            (false, true) => keyword,
            (true, false) => semantic,
            (true, true) => Vec::new(),
        };

        let terms = query_terms(query, None);
        merged
            .into_iter()
            .map(|result| self.project_document(result, &terms))
            .collect()
    }

    /// Caps an oversized whole-document hit and attaches representative chunks.
    fn project_document(&self, mut result: SearchResult, terms: &[String]) -> SearchResult {
        if !self.budget.exceeds_safe_threshold(&result.item.content) {
            return result;
        }
        let stored = match self.store {
            Some(store) => store
                .get_chunks_for_item(&result.item.id)
                .unwrap_or_else(|e| {
                    warn!(item = %result.item.id, error = %e, "failed to load chunks");
                    Vec::new()
                }),
            None => Vec::new(),
        };
        self.budget.project_oversized(&mut result, &stored, terms);
        result
    }

    /// Two-stage chunk search.
    ///
    /// Returns [`ChunkSearchOutcome::Unavailable`] without touching any index when there is no
    /// populated chunk index or no store. Store failures during aggregation are errors.
    pub fn chunk_search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<ChunkSearchOutcome, SearchError> {
        let (Some(chunks), Some(store)) = (self.chunks, self.store) else {
            return Ok(ChunkSearchOutcome::Unavailable);
        };
        if !chunks.is_available() {
            return Ok(ChunkSearchOutcome::Unavailable);
        }

        let hits = self.chunk_hits(chunks, query, options);
        debug!(query, hits = hits.len(), "chunk search stage 1");
        let results = self.aggregate(hits, store)?;
        debug!(query, items = results.len(), "chunk search stage 2");
        Ok(ChunkSearchOutcome::Completed(results))
    }

    /// Stage 1: keyword and semantic chunk hits, keeping each chunk's best score.
    fn chunk_hits(
        &self,
        chunks: &ChunkIndex,
        query: &str,
        options: &SearchOptions,
    ) -> Vec<ChunkHit> {
        let limit = options.max_results().saturating_mul(CHUNK_CANDIDATES);
        let mut hits: Vec<ChunkHit> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        let keyword = chunks
            .search(query, limit)
            .into_iter()
            .map(|hit| (hit.entity, self.normalizer.normalize(hit.score), FIELD_KEYWORD));
        let semantic = self
            .chunk_semantic
            .search(query, limit, self.settings.semantic_min_similarity)
            .into_iter()
            .map(|(chunk, score)| (chunk, score, FIELD_SEMANTIC));

        for (chunk, score, field) in keyword.chain(semantic) {
            match positions.get(&chunk.id) {
                Some(&pos) => {
                    let hit = &mut hits[pos];
                    hit.score = hit.score.max(score);
                    if !hit.fields.contains(&field) {
                        hit.fields.push(field);
                    }
                }
                None => {
                    positions.insert(chunk.id.clone(), hits.len());
                    hits.push(ChunkHit {
                        chunk,
                        score,
                        fields: vec![field],
                    });
                }
            }
        }
        hits
    }

    /// Stage 2: one result per item, with matched and context chunks.
    ///
    /// Items missing from the store are dropped.
    fn aggregate(
        &self,
        hits: Vec<ChunkHit>,
        store: &dyn KnowledgeStore,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let mut groups: Vec<(String, Vec<ChunkHit>)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for hit in hits {
            match positions.get(&hit.chunk.item_id) {
                Some(&pos) => groups[pos].1.push(hit),
                None => {
                    positions.insert(hit.chunk.item_id.clone(), groups.len());
                    groups.push((hit.chunk.item_id.clone(), vec![hit]));
                }
            }
        }

        let mut results = Vec::with_capacity(groups.len());
        for (item_id, mut group) in groups {
            let Some(item) = store.get_knowledge_item(&item_id)? else {
                debug!(item = %item_id, "dropping chunk hits for missing item");
                continue;
            };

            group.sort_by(|a, b| by_score_desc(a.score, b.score));
            let relevance_score = group.first().map_or(0.0, |h| h.score);
            let mut matched_fields = vec![FIELD_CHUNK.to_string()];
            for field in group.iter().flat_map(|h| &h.fields) {
                if !matched_fields.iter().any(|f| f.as_str() == *field) {
                    matched_fields.push((*field).to_string());
                }
            }

            group.truncate(self.budget.max_matched_chunks());
            let matched_chunks: Vec<MatchedChunk> = group
                .into_iter()
                .map(|h| MatchedChunk::from_chunk(h.chunk, Some(h.score)))
                .collect();
            let context_chunks = self.context_chunks(store, &item_id, &matched_chunks)?;

            let mut result = SearchResult {
                item,
                relevance_score,
                matched_fields,
                highlights: Vec::new(),
                matched_chunks,
                context_chunks,
            };
            self.budget.cap_item_content(&mut result);
            results.push(result);
        }
        Ok(results)
    }

    /// Neighbours of the matched chunks, in matched order, not already present.
    fn context_chunks(
        &self,
        store: &dyn KnowledgeStore,
        item_id: &str,
        matched: &[MatchedChunk],
    ) -> Result<Vec<MatchedChunk>, StoreError> {
        let limit = self.budget.max_context_chunks();
        let mut seen: HashSet<String> = matched.iter().map(|c| c.id.clone()).collect();
        let mut context = Vec::new();
        for chunk in matched {
            if context.len() >= limit {
                break;
            }
            for neighbour in store.get_adjacent_chunks(item_id, chunk.chunk_index)? {
                if context.len() >= limit {
                    break;
                }
                if seen.insert(neighbour.id.clone()) {
                    context.push(MatchedChunk::from_chunk(neighbour, None));
                }
            }
        }
        Ok(context)
    }

    /// Items semantically similar to `item`, budgeted like a search response.
    pub fn find_similar(
        &self,
        item: &KnowledgeItem,
        top_k: usize,
        min_similarity: f32,
    ) -> Vec<SearchResult> {
        let results: Vec<SearchResult> = self
            .document_semantic
            .find_similar(item, top_k, min_similarity)
            .into_iter()
            .map(|(similar, score)| SearchResult::new(similar, score, FIELD_SEMANTIC))
            .map(|result| self.project_document(result, &[]))
            .collect();
        let mut processed = Processed {
            total_found: results.len(),
            results,
            grouped: None,
        };
        self.budget.apply(&mut processed);
        processed.results
    }

    /// Completions for a partial word: index vocabulary first, then related semantic terms.
    ///
    /// Case-insensitively deduplicated, first-seen order, at most `limit`.
    pub fn suggest(&self, partial: &str, limit: usize) -> Vec<String> {
        let partial = partial.trim();
        if partial.is_empty() || limit == 0 {
            return Vec::new();
        }
        let prefixed = self.documents.vocabulary_prefix(partial, limit);
        let related = self.document_semantic.related_terms(partial, limit);

        let mut seen = HashSet::new();
        prefixed
            .into_iter()
            .chain(related)
            .filter(|term| seen.insert(term.to_lowercase()))
            .take(limit)
            .collect()
    }
}
