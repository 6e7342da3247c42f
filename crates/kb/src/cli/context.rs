//! Shared context for running CLI commands.

use std::{
    env,
    path::{Path, PathBuf},
    process::ExitCode,
};

use kb_config::Config;
use kb_search::{JsonFileStore, KnowledgeBase, store_path};

/// Command execution context built once per CLI invocation.
pub struct CommandContext {
    /// Current working directory.
    pub cwd: PathBuf,
    /// Loaded configuration (default if no config file was found).
    pub config: Config,
}

impl CommandContext {
    /// Loads the current directory and configuration.
    ///
    /// Without a config file, relative index and store paths resolve against the current
    /// directory.
    pub fn load() -> Result<Self, ExitCode> {
        let cwd = current_dir_or_failure()?;
        let mut config = load_config_or_failure(&cwd)?;
        if config.config_root.is_none() {
            config.config_root = Some(cwd.clone());
        }
        Ok(Self { cwd, config })
    }

    /// Loads only the current directory, skipping configuration parsing.
    pub fn load_cwd_only() -> Result<Self, ExitCode> {
        let cwd = current_dir_or_failure()?;
        Ok(Self {
            config: Config {
                config_root: Some(cwd.clone()),
                ..Config::default()
            },
            cwd,
        })
    }

    /// Opens the knowledge base backed by the JSON item store.
    pub fn open_base(&self) -> Result<KnowledgeBase, ExitCode> {
        let path = store_path(&self.config);
        let store = JsonFileStore::open(&path).map_err(|e| {
            eprintln!("error: failed to open store: {e}");
            ExitCode::FAILURE
        })?;
        KnowledgeBase::open(self.config.clone(), Box::new(store)).map_err(|e| {
            eprintln!("error: failed to open knowledge base: {e}");
            ExitCode::FAILURE
        })
    }
}

/// Returns the current working directory or exits with a consistent error.
fn current_dir_or_failure() -> Result<PathBuf, ExitCode> {
    env::current_dir().map_err(|e| {
        eprintln!("error: could not determine current directory: {e}");
        ExitCode::FAILURE
    })
}

/// Loads configuration from the provided directory or exits with an error.
fn load_config_or_failure(cwd: &Path) -> Result<Config, ExitCode> {
    Config::load(cwd).map_err(|e| {
        eprintln!("error: failed to load configuration: {e}");
        ExitCode::FAILURE
    })
}
