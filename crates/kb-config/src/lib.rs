//! Configuration system for kb.
//!
//! kb uses a TOML configuration file named `.kb.toml`. The file is located by walking up the
//! directory tree from the current working directory; the first file found wins. If none is
//! found, `~/.kb.toml` is used, and if that does not exist either, defaults apply.

#![warn(missing_docs)]

mod discovery;
mod error;
mod parse;
mod templates;
mod validate;

use std::path::{Path, PathBuf};

pub use discovery::{CONFIG_FILENAME, discover_config_file, global_config_path, is_global_config};
pub use error::ConfigError;
pub use parse::{ConfigFile, parse_config_file, parse_config_str};
use serde::{Deserialize, Serialize};
pub use templates::local_template;
pub use validate::ConfigWarning;
use validate::validate_config;

/// Fully resolved configuration for kb.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Index and store locations.
    pub index: IndexSettings,
    /// Chunker parameters.
    pub chunking: ChunkSettings,
    /// Search orchestration parameters.
    pub search: SearchSettings,
    /// Content-size budgets applied to search responses.
    pub budget: BudgetSettings,
    /// Directory containing the config file that was loaded, if any.
    pub config_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration by discovering `.kb.toml` from `cwd` upwards.
    ///
    /// Returns `Ok(Config::default())` if no configuration file is found.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        match discover_config_file(cwd) {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Loads configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = parse_config_file(path)?;
        let config_root = path.parent().map(Path::to_path_buf);
        Ok(Self::from_file(file, config_root))
    }

    /// Builds a configuration from parsed file contents and its root directory.
    pub fn from_file(file: ConfigFile, config_root: Option<PathBuf>) -> Self {
        Self {
            index: file.index,
            chunking: file.chunking,
            search: file.search,
            budget: file.budget,
            config_root,
        }
    }

    /// Validates the configuration and returns any warnings.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        validate_config(self)
    }

    /// Resolves a configured path against the config root.
    ///
    /// Absolute paths are returned as-is. Relative paths are joined to the config root, or
    /// returned unchanged when no config file was loaded.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match &self.config_root {
            Some(root) => root.join(path),
            None => path.to_path_buf(),
        }
    }

    /// Serializes the effective settings to TOML format.
    pub fn settings_to_toml(&self) -> Result<String, ConfigError> {
        let file = ConfigFile {
            index: self.index.clone(),
            chunking: self.chunking.clone(),
            search: self.search.clone(),
            budget: self.budget.clone(),
        };
        toml::to_string_pretty(&file).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

/// Where the index and the item store live on disk.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Document index directory; the chunk index lives in its `chunks` subdirectory.
    pub path: PathBuf,
    /// Stemming language for the keyword analyzer.
    pub stemmer: String,
    /// Path of the JSON item store.
    pub store: PathBuf,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".kb/index"),
            stemmer: String::from("english"),
            store: PathBuf::from(".kb/store.json"),
        }
    }
}

/// Parameters for splitting item content into chunks.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChunkSettings {
    /// Content shorter than twice this many characters becomes a single chunk.
    pub min_chunk_size: usize,
    /// Maximum chunk size in characters.
    pub max_chunk_size: usize,
    /// Fraction of a sliding window shared with the next window.
    pub overlap_ratio: f32,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            min_chunk_size: 100,
            max_chunk_size: 1500,
            overlap_ratio: 0.2,
        }
    }
}

/// Search orchestration settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Default number of results per query.
    pub default_limit: usize,
    /// Weight of keyword scores in document-level fusion.
    pub keyword_weight: f32,
    /// Weight of semantic scores in document-level fusion.
    pub semantic_weight: f32,
    /// Raw keyword scores are divided by this value (and capped at 1.0).
    pub keyword_score_divisor: f32,
    /// Minimum cosine similarity for semantic hits.
    pub semantic_min_similarity: f32,
    /// Maximum number of suggestions returned.
    pub suggest_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_limit: 10,
            keyword_weight: 0.6,
            semantic_weight: 0.4,
            keyword_score_divisor: 10.0,
            semantic_min_similarity: 0.1,
            suggest_limit: 10,
        }
    }
}

/// Upper bounds on the content returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BudgetSettings {
    /// Maximum characters of content per returned chunk.
    pub max_chunk_content_size: usize,
    /// Maximum characters of content per search result.
    pub max_result_content_size: usize,
    /// Maximum characters of content per response.
    pub max_total_content_size: usize,
    /// Item content above this size is truncated in whole-document results.
    pub safe_content_threshold: usize,
    /// Maximum matched chunks attached to one result.
    pub max_matched_chunks_per_item: usize,
    /// Maximum context chunks attached to one result.
    pub max_context_chunks_per_item: usize,
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            max_chunk_content_size: 1500,
            max_result_content_size: 30_000,
            max_total_content_size: 100_000,
            safe_content_threshold: 5000,
            max_matched_chunks_per_item: 3,
            max_context_chunks_per_item: 6,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.chunking.min_chunk_size, 100);
        assert_eq!(config.chunking.max_chunk_size, 1500);
        assert!((config.chunking.overlap_ratio - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.budget.max_total_content_size, 100_000);
        assert_eq!(config.index.stemmer, "english");
    }

    #[test]
    fn resolve_path_joins_config_root() {
        let config = Config {
            config_root: Some(PathBuf::from("/projects/notes")),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_path(Path::new(".kb/index")),
            PathBuf::from("/projects/notes/.kb/index")
        );
        assert_eq!(
            config.resolve_path(Path::new("/abs/index")),
            PathBuf::from("/abs/index")
        );
    }

    #[test]
    fn resolve_path_without_root_is_unchanged() {
        let config = Config::default();
        assert_eq!(
            config.resolve_path(Path::new(".kb/index")),
            PathBuf::from(".kb/index")
        );
    }

    #[test]
    fn settings_round_trip_through_toml() {
        let mut config = Config::default();
        config.search.keyword_weight = 0.7;
        config.search.semantic_weight = 0.3;

        let toml = config.settings_to_toml().unwrap();
        let parsed = parse_config_str(&toml, Path::new("test.toml")).unwrap();

        assert_eq!(parsed.search, config.search);
        assert_eq!(parsed.budget, config.budget);
    }
}
