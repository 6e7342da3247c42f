//! Implementation of `kb search`.

use std::process::ExitCode;

use kb_search::{OptionsError, SearchOptions};

use crate::cli::{
    args::SearchCommand,
    context::CommandContext,
    output::{print_json, print_search_results},
};

/// Builds search options from flags, falling back to configured defaults.
fn build_options(cmd: &SearchCommand, default_limit: usize) -> Result<SearchOptions, OptionsError> {
    let mut builder = SearchOptions::builder()
        .max_results(cmd.limit.unwrap_or(default_limit))
        .sort_by(cmd.sort)
        .group_by_category(cmd.group);
    if let Some(min) = cmd.min_relevance {
        builder = builder.min_relevance(min);
    }
    for category in &cmd.categories {
        builder = builder.include_category(category);
    }
    for category in &cmd.exclude_categories {
        builder = builder.exclude_category(category);
    }
    for tag in &cmd.tags {
        builder = builder.include_tag(tag);
    }
    for tag in &cmd.exclude_tags {
        builder = builder.exclude_tag(tag);
    }
    builder.build()
}

/// Searches the knowledge base and prints the response.
pub fn run(ctx: &CommandContext, cmd: &SearchCommand) -> ExitCode {
    let options = match build_options(cmd, ctx.config.search.default_limit) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let kb = match ctx.open_base() {
        Ok(kb) => kb,
        Err(code) => return code,
    };
    let results = kb.search(&cmd.query, &options);

    if cmd.json {
        return print_json(&results);
    }
    print_search_results(&results);
    ExitCode::SUCCESS
}
