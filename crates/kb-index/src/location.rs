//! Index location resolution.
//!
//! The document index lives in `[index] path` (default `.kb/index`), resolved against the
//! directory holding the loaded `.kb.toml`. The chunk index lives in its `chunks`
//! subdirectory so that both can be opened, rebuilt and removed independently.

use std::path::{Path, PathBuf};

use kb_config::Config;

/// Subdirectory of the document index holding the chunk index.
pub const CHUNK_INDEX_DIR: &str = "chunks";

/// Directory of the document index.
pub fn index_directory(config: &Config) -> PathBuf {
    config.resolve_path(&config.index.path)
}

/// Directory of the chunk index for a document index directory.
pub fn chunk_index_directory(index_dir: &Path) -> PathBuf {
    index_dir.join(CHUNK_INDEX_DIR)
}
