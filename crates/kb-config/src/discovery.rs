//! Configuration file discovery.
//!
//! Finds the `.kb.toml` closest to a starting directory, falling back to the global
//! `~/.kb.toml` if present.

use std::path::{Path, PathBuf};

use directories::BaseDirs;

/// The configuration filename.
pub const CONFIG_FILENAME: &str = ".kb.toml";

/// Discovers the configuration file for the given directory.
///
/// Walks up from `cwd` to the filesystem root and returns the first `.kb.toml` found. If
/// none exists, returns `~/.kb.toml` when that file exists.
pub fn discover_config_file(cwd: &Path) -> Option<PathBuf> {
    let mut current = Some(cwd);
    while let Some(dir) = current {
        let config_path = dir.join(CONFIG_FILENAME);
        if config_path.is_file() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    global_config_path().filter(|path| path.is_file())
}

/// Returns the path to the global configuration file (`~/.kb.toml`).
///
/// Returns `None` if the home directory cannot be determined.
pub fn global_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(CONFIG_FILENAME))
}

/// Checks if a path is the global configuration file.
pub fn is_global_config(path: &Path) -> bool {
    global_config_path().is_some_and(|global| path == global)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn finds_config_in_cwd() {
        let temp = tempfile::tempdir().unwrap();
        let config = temp.path().join(CONFIG_FILENAME);
        fs::write(&config, "").unwrap();

        assert_eq!(discover_config_file(temp.path()), Some(config));
    }

    #[test]
    fn finds_config_in_ancestor() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        let config = temp.path().join(CONFIG_FILENAME);
        fs::write(&config, "").unwrap();

        assert_eq!(discover_config_file(&nested), Some(config));
    }

    #[test]
    fn closest_config_wins() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("project");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join(CONFIG_FILENAME), "").unwrap();
        let inner = nested.join(CONFIG_FILENAME);
        fs::write(&inner, "").unwrap();

        assert_eq!(discover_config_file(&nested), Some(inner));
    }

    #[test]
    fn directory_named_like_config_is_ignored() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join(CONFIG_FILENAME)).unwrap();

        let found = discover_config_file(temp.path());
        assert_ne!(found, Some(temp.path().join(CONFIG_FILENAME)));
    }
}
