//! Implementation of `kb rebuild`.

use std::process::ExitCode;

use crate::cli::context::CommandContext;

/// Re-chunks every stored item and rebuilds all indexes.
pub fn run(ctx: &CommandContext) -> ExitCode {
    let kb = match ctx.open_base() {
        Ok(kb) => kb,
        Err(code) => return code,
    };

    match kb.rebuild() {
        Ok(stats) => {
            println!("Rebuilt {} items into {} chunks", stats.items, stats.chunks);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: rebuild failed: {e}");
            ExitCode::FAILURE
        }
    }
}
