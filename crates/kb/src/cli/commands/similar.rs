//! Implementation of `kb similar`.

use std::process::ExitCode;

use kb_search::SearchError;

use crate::cli::{
    args::SimilarCommand,
    context::CommandContext,
    output::{dim, print_json, results_table},
};

/// Prints items semantically similar to a stored item.
pub fn run(ctx: &CommandContext, cmd: &SimilarCommand) -> ExitCode {
    let kb = match ctx.open_base() {
        Ok(kb) => kb,
        Err(code) => return code,
    };

    let search = &ctx.config.search;
    let limit = cmd.limit.unwrap_or(search.default_limit);
    let results = match kb.find_similar(&cmd.id, limit, search.semantic_min_similarity) {
        Ok(results) => results,
        Err(SearchError::ItemNotFound(id)) => {
            eprintln!("error: no item with id {id}");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("error: similarity search failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cmd.json {
        return print_json(&results);
    }
    if results.is_empty() {
        println!("{}", dim("No similar items found."));
    } else {
        println!("{}", results_table(&results));
    }
    ExitCode::SUCCESS
}
