//! Clap argument definitions for the `kb` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use kb_search::SortBy;

/// Parses a sort order from a string.
fn parse_sort(s: &str) -> Result<SortBy, String> {
    s.parse()
}

/// Parses a relevance threshold in `[0, 1]`.
fn parse_relevance(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in the range 0.0-1.0"))
    }
}

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "kb")]
#[command(about = "Knowledge base with chunked hybrid search")]
pub struct Cli {
    /// Enable debug logging on stderr (overrides KB_LOG)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments for `kb init`.
#[derive(Args, Debug, Clone)]
pub struct InitCommand {
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for `kb add`.
#[derive(Args, Debug, Clone)]
pub struct AddCommand {
    /// Files to ingest
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Arguments for `kb search`.
#[derive(Args, Debug, Clone)]
pub struct SearchCommand {
    /// Search query
    pub query: String,

    /// Maximum results to return [default: search.default_limit]
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Drop results scoring below this relevance (0.0-1.0)
    #[arg(long, value_parser = parse_relevance)]
    pub min_relevance: Option<f32>,

    /// Only include items in this category (can be specified multiple times)
    #[arg(long = "category")]
    pub categories: Vec<String>,

    /// Only include items carrying this tag (can be specified multiple times)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Exclude items in this category (can be specified multiple times)
    #[arg(long = "exclude-category")]
    pub exclude_categories: Vec<String>,

    /// Exclude items carrying this tag (can be specified multiple times)
    #[arg(long = "exclude-tag")]
    pub exclude_tags: Vec<String>,

    /// Result order: relevance, date or title
    #[arg(long, value_parser = parse_sort, default_value = "relevance")]
    pub sort: SortBy,

    /// Also group results by category
    #[arg(long)]
    pub group: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `kb suggest`.
#[derive(Args, Debug, Clone)]
pub struct SuggestCommand {
    /// Partial word to complete
    pub partial: String,

    /// Maximum suggestions [default: search.suggest_limit]
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// Arguments for `kb similar`.
#[derive(Args, Debug, Clone)]
pub struct SimilarCommand {
    /// Item ID
    pub id: String,

    /// Maximum results to return [default: search.default_limit]
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `kb rm`.
#[derive(Args, Debug, Clone)]
pub struct RmCommand {
    /// Item ID
    pub id: String,
}

/// Supported `kb` subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Create a .kb.toml configuration file in the current directory
    Init(InitCommand),

    /// Ingest files into the knowledge base
    Add(AddCommand),

    /// Search the knowledge base
    Search(SearchCommand),

    /// Complete a partial word from the indexed vocabulary
    Suggest(SuggestCommand),

    /// Find items similar to a stored item
    Similar(SimilarCommand),

    /// Remove an item and its chunks
    Rm(RmCommand),

    /// Re-chunk every item and rebuild all indexes
    Rebuild,

    /// Show configuration, index and store status
    Status,

    /// Validate configuration and report warnings
    Check,
}

impl Commands {
    /// Whether the command needs a parsed configuration.
    ///
    /// `init` must work even when an existing config file is invalid.
    pub fn needs_config(&self) -> bool {
        !matches!(self, Self::Init(_))
    }
}
