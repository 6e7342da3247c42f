//! Result post-processing: weighted merge, filtering, ordering, grouping and truncation.
//!
//! The pipeline order is fixed:
//! 1. category include/exclude
//! 2. tag include/exclude
//! 3. allowed source types
//! 4. minimum relevance
//! 5. sort (stable)
//! 6. group by category, from the full sorted list
//! 7. truncate to `max_results`

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
};

use crate::{SearchOptions, SearchResult, SortBy};

/// Group name for items without categories.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Output of [`process`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Processed {
    /// Filtered, sorted and truncated results.
    pub results: Vec<SearchResult>,
    /// Results by category, when grouping was requested.
    pub grouped: Option<BTreeMap<String, Vec<SearchResult>>>,
    /// Number of results that passed the filters.
    pub total_found: usize,
}

/// Runs the filter, sort, group and truncate pipeline.
pub fn process(results: Vec<SearchResult>, options: &SearchOptions) -> Processed {
    let mut kept: Vec<SearchResult> = results
        .into_iter()
        .filter(|r| passes_filters(r, options))
        .collect();
    let total_found = kept.len();

    sort_results(&mut kept, options.sort_by());

    let grouped = options.group_by_category().then(|| group_by_category(&kept));

    kept.truncate(options.max_results());
    Processed {
        results: kept,
        grouped,
        total_found,
    }
}

/// Returns true if `result` survives every filter in `options`.
fn passes_filters(result: &SearchResult, options: &SearchOptions) -> bool {
    let item = &result.item;
    holds_any_or_unfiltered(&item.categories, options.include_categories())
        && holds_none(&item.categories, options.exclude_categories())
        && holds_any_or_unfiltered(&item.tags, options.include_tags())
        && holds_none(&item.tags, options.exclude_tags())
        && (options.source_types().is_empty()
            || options.source_types().contains(&item.source_type))
        && result.relevance_score >= options.min_relevance()
}

/// True if `wanted` is empty or `held` contains one of its values.
fn holds_any_or_unfiltered(held: &[String], wanted: &[String]) -> bool {
    wanted.is_empty() || held.iter().any(|h| wanted.contains(h))
}

/// True if `held` contains none of `excluded`.
fn holds_none(held: &[String], excluded: &[String]) -> bool {
    !held.iter().any(|h| excluded.contains(h))
}

/// Sorts in place; ties keep their incoming order.
pub fn sort_results(results: &mut [SearchResult], sort_by: SortBy) {
    match sort_by {
        SortBy::Relevance => results.sort_by(|a, b| by_score_desc(a.relevance_score, b.relevance_score)),
        SortBy::Date => results.sort_by(|a, b| b.item.updated_at.cmp(&a.item.updated_at)),
        SortBy::Title => {
            results.sort_by_cached_key(|r| r.item.title.to_lowercase());
        }
    }
}

/// Descending score order treating NaN as lowest.
pub(crate) fn by_score_desc(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a).unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

/// Groups results under each category they hold, preserving order within each group.
fn group_by_category(results: &[SearchResult]) -> BTreeMap<String, Vec<SearchResult>> {
    let mut groups: BTreeMap<String, Vec<SearchResult>> = BTreeMap::new();
    for result in results {
        if result.item.categories.is_empty() {
            groups
                .entry(UNCATEGORIZED.to_string())
                .or_default()
                .push(result.clone());
        }
        for category in &result.item.categories {
            groups.entry(category.clone()).or_default().push(result.clone());
        }
    }
    groups
}

/// Merges result lists from several sources by item id.
///
/// Each item's score is the weighted sum of its scores across sources, capped at 1.0. The first
/// occurrence of an item supplies its data; provenance tags are unioned in first-seen order.
/// Output is sorted by merged score, highest first.
pub fn weighted_merge(sources: Vec<(Vec<SearchResult>, f32)>) -> Vec<SearchResult> {
    let mut merged: Vec<SearchResult> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (results, weight) in sources {
        for result in results {
            let weighted = result.relevance_score * weight;
            match positions.get(&result.item.id) {
                Some(&pos) => {
                    let existing = &mut merged[pos];
                    existing.relevance_score += weighted;
                    for field in result.matched_fields {
                        if !existing.matched_fields.contains(&field) {
                            existing.matched_fields.push(field);
                        }
                    }
                }
                None => {
                    positions.insert(result.item.id.clone(), merged.len());
                    merged.push(SearchResult {
                        relevance_score: weighted,
                        ..result
                    });
                }
            }
        }
    }

    for result in &mut merged {
        result.relevance_score = result.relevance_score.min(1.0);
    }
    merged.sort_by(|a, b| by_score_desc(a.relevance_score, b.relevance_score));
    merged
}
