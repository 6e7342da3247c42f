//! Configuration file parsing.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{BudgetSettings, ChunkSettings, ConfigError, IndexSettings, SearchSettings};

/// Configuration as parsed directly from a `.kb.toml` file.
///
/// Every section is optional; missing sections and keys take their defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigFile {
    /// `[index]` section.
    pub index: IndexSettings,
    /// `[chunking]` section.
    pub chunking: ChunkSettings,
    /// `[search]` section.
    pub search: SearchSettings,
    /// `[budget]` section.
    pub budget: BudgetSettings,
}

/// Parses a configuration file from disk.
pub fn parse_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_str(&content, path)
}

/// Parses configuration from a string. `path` is used for error reporting only.
pub fn parse_config_str(content: &str, path: &Path) -> Result<ConfigFile, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}
