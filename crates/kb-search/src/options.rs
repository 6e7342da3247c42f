//! Search options and their validating builder.

use std::{fmt, str::FromStr};

use kb_document::SourceType;
use serde::{Deserialize, Serialize};

use crate::OptionsError;

/// Default number of results returned.
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Result ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Highest relevance first.
    #[default]
    Relevance,
    /// Most recently updated first.
    Date,
    /// Title ascending, case-insensitive.
    Title,
}

impl SortBy {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::Date => "date",
            Self::Title => "title",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relevance" => Ok(Self::Relevance),
            "date" => Ok(Self::Date),
            "title" => Ok(Self::Title),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Filters, ordering and limits for one search.
///
/// Built through [`SearchOptions::builder`], which rejects invalid combinations up front.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Maximum number of results.
    max_results: usize,
    /// Minimum relevance a result must reach.
    min_relevance: f32,
    /// Keep only items in at least one of these categories.
    include_categories: Vec<String>,
    /// Drop items in any of these categories.
    exclude_categories: Vec<String>,
    /// Keep only items with at least one of these tags.
    include_tags: Vec<String>,
    /// Drop items with any of these tags.
    exclude_tags: Vec<String>,
    /// Keep only items of these source types.
    source_types: Vec<SourceType>,
    /// Result ordering.
    sort_by: SortBy,
    /// Also group results by category.
    group_by_category: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            min_relevance: 0.0,
            include_categories: Vec::new(),
            exclude_categories: Vec::new(),
            include_tags: Vec::new(),
            exclude_tags: Vec::new(),
            source_types: Vec::new(),
            sort_by: SortBy::Relevance,
            group_by_category: false,
        }
    }
}

impl SearchOptions {
    /// Starts a builder from the defaults.
    pub fn builder() -> SearchOptionsBuilder {
        SearchOptionsBuilder::default()
    }

    /// Maximum number of results.
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Minimum relevance a result must reach.
    pub fn min_relevance(&self) -> f32 {
        self.min_relevance
    }

    /// Categories of which an item must hold at least one.
    pub fn include_categories(&self) -> &[String] {
        &self.include_categories
    }

    /// Categories that exclude an item.
    pub fn exclude_categories(&self) -> &[String] {
        &self.exclude_categories
    }

    /// Tags of which an item must hold at least one.
    pub fn include_tags(&self) -> &[String] {
        &self.include_tags
    }

    /// Tags that exclude an item.
    pub fn exclude_tags(&self) -> &[String] {
        &self.exclude_tags
    }

    /// Allowed source types; empty allows all.
    pub fn source_types(&self) -> &[SourceType] {
        &self.source_types
    }

    /// Result ordering.
    pub fn sort_by(&self) -> SortBy {
        self.sort_by
    }

    /// Whether results are also grouped by category.
    pub fn group_by_category(&self) -> bool {
        self.group_by_category
    }
}

/// Builder for [`SearchOptions`].
#[derive(Debug, Clone, Default)]
pub struct SearchOptionsBuilder {
    /// Options under construction.
    options: SearchOptions,
}

impl SearchOptionsBuilder {
    /// Sets the maximum number of results.
    pub fn max_results(mut self, max_results: usize) -> Self {
        self.options.max_results = max_results;
        self
    }

    /// Sets the minimum relevance.
    pub fn min_relevance(mut self, min_relevance: f32) -> Self {
        self.options.min_relevance = min_relevance;
        self
    }

    /// Requires one of the included categories.
    pub fn include_category(mut self, category: impl Into<String>) -> Self {
        push_unique(&mut self.options.include_categories, category.into());
        self
    }

    /// Excludes a category.
    pub fn exclude_category(mut self, category: impl Into<String>) -> Self {
        push_unique(&mut self.options.exclude_categories, category.into());
        self
    }

    /// Requires one of the included tags.
    pub fn include_tag(mut self, tag: impl Into<String>) -> Self {
        push_unique(&mut self.options.include_tags, tag.into());
        self
    }

    /// Excludes a tag.
    pub fn exclude_tag(mut self, tag: impl Into<String>) -> Self {
        push_unique(&mut self.options.exclude_tags, tag.into());
        self
    }

    /// Allows a source type. With none set, every type is allowed.
    pub fn source_type(mut self, source_type: SourceType) -> Self {
        if !self.options.source_types.contains(&source_type) {
            self.options.source_types.push(source_type);
        }
        self
    }

    /// Sets the ordering.
    pub fn sort_by(mut self, sort_by: SortBy) -> Self {
        self.options.sort_by = sort_by;
        self
    }

    /// Enables grouping by category.
    pub fn group_by_category(mut self, group: bool) -> Self {
        self.options.group_by_category = group;
        self
    }

    /// Validates and returns the options.
    pub fn build(self) -> Result<SearchOptions, OptionsError> {
        let options = self.options;
        if options.max_results == 0 {
            return Err(OptionsError::ZeroMaxResults);
        }
        if !(0.0..=1.0).contains(&options.min_relevance) {
            return Err(OptionsError::MinRelevanceOutOfRange(options.min_relevance));
        }
        if let Some(c) = first_shared(&options.include_categories, &options.exclude_categories) {
            return Err(OptionsError::ConflictingCategory(c.clone()));
        }
        if let Some(t) = first_shared(&options.include_tags, &options.exclude_tags) {
            return Err(OptionsError::ConflictingTag(t.clone()));
        }
        Ok(options)
    }
}

/// Appends non-empty `value` unless already present.
fn push_unique(values: &mut Vec<String>, value: String) {
    if !value.is_empty() && !values.contains(&value) {
        values.push(value);
    }
}

/// First element of `a` that is also in `b`.
fn first_shared<'a>(a: &'a [String], b: &[String]) -> Option<&'a String> {
    a.iter().find(|v| b.contains(v))
}
