//! Integration tests for kb-config.
//!
//! Tests the full configuration loading pipeline: discovery -> parse -> resolve.

// Integration tests live outside cfg(test) by design
#![allow(clippy::tests_outside_test_module)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use kb_config::{CONFIG_FILENAME, Config, ConfigError};

/// Test helper to create a temporary directory structure for tests.
struct TestEnv {
    root: tempfile::TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.root.path()
    }

    /// Creates a file with content and returns its path.
    fn create_file(&self, rel_path: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }
}

#[test]
fn test_load_from_file_sets_config_root() {
    let env = TestEnv::new();
    let path = env.create_file(
        CONFIG_FILENAME,
        r#"
[search]
default_limit = 25
"#,
    );

    let config = Config::load_from_file(&path).unwrap();

    assert_eq!(config.config_root.as_deref(), Some(env.path()));
    assert_eq!(config.search.default_limit, 25);
    assert_eq!(config.chunking.max_chunk_size, 1500);
}

#[test]
fn test_load_discovers_parent_config() {
    let env = TestEnv::new();
    env.create_file(
        CONFIG_FILENAME,
        r#"
[index]
path = "store/idx"
"#,
    );
    let nested = env.path().join("notes").join("2024");
    fs::create_dir_all(&nested).unwrap();

    let config = Config::load(&nested).unwrap();

    assert_eq!(
        config.resolve_path(&config.index.path),
        env.path().join("store").join("idx")
    );
}

#[test]
fn test_load_reports_parse_errors() {
    let env = TestEnv::new();
    env.create_file(CONFIG_FILENAME, "[budget]\nmax_total_content_size = -1\n");

    let err = Config::load(env.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ParseToml { .. }));
}

#[test]
fn test_loaded_config_validates() {
    let env = TestEnv::new();
    let path = env.create_file(
        CONFIG_FILENAME,
        r#"
[search]
keyword_weight = 0.5
semantic_weight = 0.2
"#,
    );

    let config = Config::load_from_file(&path).unwrap();
    let warnings = config.validate();

    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].to_string().contains("keyword 0.5"));
}
