//! Content-size budgets for search responses.
//!
//! Limits, all in characters:
//! - each returned chunk is cut to `max_chunk_content_size`
//! - each result (item content plus its chunks) stays within `max_result_content_size`
//! - a response, counted once per distinct item across `results` and `grouped_results`, stays
//!   within `max_total_content_size`
//! - whole-document hits carry at most `safe_content_threshold` characters of item content
//!
//! Applying a budget twice gives the same output as applying it once.

use std::collections::{BTreeMap, HashMap};

use kb_config::BudgetSettings;
use kb_document::KnowledgeChunk;

use crate::{MatchedChunk, SearchResult, process::Processed};

/// Content budgets derived from [`BudgetSettings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBudget {
    /// Per-chunk limit.
    max_chunk: usize,
    /// Per-result limit.
    max_result: usize,
    /// Per-response limit.
    max_total: usize,
    /// Item content limit for whole-document hits.
    safe_threshold: usize,
    /// Matched chunks kept per result.
    max_matched: usize,
    /// Context chunks kept per result.
    max_context: usize,
}

impl ContentBudget {
    /// Builds a budget from settings.
    pub fn from_settings(settings: &BudgetSettings) -> Self {
        Self {
            max_chunk: settings.max_chunk_content_size,
            max_result: settings.max_result_content_size,
            max_total: settings.max_total_content_size,
            safe_threshold: settings.safe_content_threshold,
            max_matched: settings.max_matched_chunks_per_item,
            max_context: settings.max_context_chunks_per_item,
        }
    }

    /// Matched chunks kept per result.
    pub fn max_matched_chunks(&self) -> usize {
        self.max_matched
    }

    /// Context chunks kept per result.
    pub fn max_context_chunks(&self) -> usize {
        self.max_context
    }

    /// Item content limit for whole-document hits.
    pub fn safe_content_threshold(&self) -> usize {
        self.safe_threshold
    }

    /// Returns true if `content` is longer than the safe threshold.
    pub fn exceeds_safe_threshold(&self, content: &str) -> bool {
        content.chars().nth(self.safe_threshold).is_some()
    }

    /// Cuts item content to the safe threshold. Returns whether anything was cut.
    pub fn cap_item_content(&self, result: &mut SearchResult) -> bool {
        truncate_chars(&mut result.item.content, self.safe_threshold)
    }

    /// Projects a whole-document hit on an oversized item.
    ///
    /// When the result has no matched chunks, they are taken from `stored`: the chunks that
    /// mention one of `terms`, else the first chunk. Without stored chunks a pseudo-chunk holding
    /// the head of the content is synthesized. The item content is then capped.
    pub fn project_oversized(
        &self,
        result: &mut SearchResult,
        stored: &[KnowledgeChunk],
        terms: &[String],
    ) {
        if result.matched_chunks.is_empty() {
            let score = Some(result.relevance_score);
            let terms: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
            let mut chosen: Vec<MatchedChunk> = stored
                .iter()
                .filter(|c| {
                    let content = c.content.to_lowercase();
                    terms.iter().any(|t| content.contains(t.as_str()))
                })
                .take(self.max_matched.max(1))
                .map(|c| MatchedChunk::from_chunk(c.clone(), score))
                .collect();
            if chosen.is_empty() {
                chosen = stored
                    .first()
                    .map(|c| MatchedChunk::from_chunk(c.clone(), score))
                    .into_iter()
                    .collect();
            }
            if chosen.is_empty() {
                chosen.push(self.pseudo_chunk(result, score));
            }
            result.matched_chunks = chosen;
        }
        self.cap_item_content(result);
    }

    /// A chunk covering the head of the item content.
    fn pseudo_chunk(&self, result: &SearchResult, score: Option<f32>) -> MatchedChunk {
        let item = &result.item;
        let mut content = item.content.clone();
        truncate_chars(&mut content, self.max_chunk.max(1));
        MatchedChunk {
            id: KnowledgeChunk::chunk_id(&item.id, 0),
            item_id: item.id.clone(),
            chunk_index: 0,
            heading: item.title.clone(),
            end_position: content.len(),
            content,
            start_position: 0,
            score,
        }
    }

    /// Applies every budget to a processed response.
    pub fn apply(&self, processed: &mut Processed) {
        for result in &mut processed.results {
            self.fit_result(result);
        }
        if let Some(groups) = &mut processed.grouped {
            for result in groups.values_mut().flatten() {
                self.fit_result(result);
            }
        }
        self.fit_response(&mut processed.results, &mut processed.grouped);
    }

    /// Fits one result within the chunk and result limits.
    ///
    /// Chunks are cut to the chunk limit and chunk counts capped. Over the result limit, context
    /// chunks go first (from the end), then matched chunks lowest score first down to one, then
    /// the item content is cut. The last matched chunk is cut only if it alone is over the limit.
    pub fn fit_result(&self, result: &mut SearchResult) {
        result.matched_chunks.truncate(self.max_matched);
        result.context_chunks.truncate(self.max_context);
        for chunk in result
            .matched_chunks
            .iter_mut()
            .chain(result.context_chunks.iter_mut())
        {
            truncate_chars(&mut chunk.content, self.max_chunk);
        }

        let mut size = result.content_size();
        while size > self.max_result {
            if let Some(chunk) = result.context_chunks.pop() {
                size -= chunk.content_len();
                continue;
            }
            if result.matched_chunks.len() > 1 {
                let pos = lowest_scored(&result.matched_chunks);
                size -= result.matched_chunks.remove(pos).content_len();
                continue;
            }
            let chunk_size: usize = result.matched_chunks.iter().map(MatchedChunk::content_len).sum();
            let room = self.max_result.saturating_sub(chunk_size);
            truncate_chars(&mut result.item.content, room);
            if let Some(chunk) = result.matched_chunks.first_mut() {
                truncate_chars(&mut chunk.content, self.max_result);
            }
            break;
        }
    }

    /// Drops whole results, lowest score first, until the response fits the total limit.
    ///
    /// An item in both `results` and `grouped` counts once.
    pub fn fit_response(
        &self,
        results: &mut Vec<SearchResult>,
        grouped: &mut Option<BTreeMap<String, Vec<SearchResult>>>,
    ) {
        let mut order: Vec<String> = Vec::new();
        let mut sizes: HashMap<String, (usize, f32)> = HashMap::new();
        let all = results
            .iter()
            .chain(grouped.iter().flat_map(|g| g.values().flatten()));
        for result in all {
            if !sizes.contains_key(&result.item.id) {
                order.push(result.item.id.clone());
                sizes.insert(
                    result.item.id.clone(),
                    (result.content_size(), result.relevance_score),
                );
            }
        }

        let mut total: usize = sizes.values().map(|(size, _)| size).sum();
        while total > self.max_total {
            let Some(victim) = lowest_scored_id(&order, &sizes) else {
                break;
            };
            order.retain(|id| *id != victim);
            if let Some((size, _)) = sizes.remove(&victim) {
                total -= size;
            }
            results.retain(|r| r.item.id != victim);
            if let Some(groups) = grouped {
                for members in groups.values_mut() {
                    members.retain(|r| r.item.id != victim);
                }
                groups.retain(|_, members| !members.is_empty());
            }
        }
    }
}

impl Default for ContentBudget {
    fn default() -> Self {
        Self::from_settings(&BudgetSettings::default())
    }
}

/// Index of the lowest-scored chunk; the last one wins ties. Unscored chunks rank lowest.
fn lowest_scored(chunks: &[MatchedChunk]) -> usize {
    let mut pos = 0;
    for (i, chunk) in chunks.iter().enumerate() {
        let current = chunks[pos].score.unwrap_or(f32::NEG_INFINITY);
        if chunk.score.unwrap_or(f32::NEG_INFINITY) <= current {
            pos = i;
        }
    }
    pos
}

/// Id of the lowest-scored item; the last one in `order` wins ties.
fn lowest_scored_id(order: &[String], sizes: &HashMap<String, (usize, f32)>) -> Option<String> {
    let mut victim: Option<(&String, f32)> = None;
    for id in order {
        let score = sizes.get(id).map_or(f32::NEG_INFINITY, |(_, score)| *score);
        if victim.is_none_or(|(_, lowest)| score <= lowest) {
            victim = Some((id, score));
        }
    }
    victim.map(|(id, _)| id.clone())
}

/// Truncates `text` to at most `max` characters. Returns whether anything was removed.
pub fn truncate_chars(text: &mut String, max: usize) -> bool {
    match text.char_indices().nth(max) {
        Some((byte, _)) => {
            text.truncate(byte);
            true
        }
        None => false,
    }
}
