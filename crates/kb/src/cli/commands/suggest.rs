//! Implementation of `kb suggest`.

use std::process::ExitCode;

use crate::cli::{args::SuggestCommand, context::CommandContext, output::dim};

/// Prints completions for a partial word, one per line.
pub fn run(ctx: &CommandContext, cmd: &SuggestCommand) -> ExitCode {
    let kb = match ctx.open_base() {
        Ok(kb) => kb,
        Err(code) => return code,
    };

    let limit = cmd.limit.unwrap_or(ctx.config.search.suggest_limit);
    let suggestions = kb.suggest(&cmd.partial, limit);
    if suggestions.is_empty() {
        println!("{}", dim("No suggestions."));
    }
    for suggestion in suggestions {
        println!("{suggestion}");
    }
    ExitCode::SUCCESS
}
