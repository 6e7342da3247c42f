//! Implementation of `kb rm`.

use std::process::ExitCode;

use crate::cli::{args::RmCommand, context::CommandContext};

/// Removes an item, its chunks and its index entries.
pub fn run(ctx: &CommandContext, cmd: &RmCommand) -> ExitCode {
    let kb = match ctx.open_base() {
        Ok(kb) => kb,
        Err(code) => return code,
    };

    match kb.delete_item(&cmd.id) {
        Ok(true) => {
            println!("Removed {}", cmd.id);
            ExitCode::SUCCESS
        }
        Ok(false) => {
            eprintln!("error: no item with id {}", cmd.id);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: failed to remove {}: {e}", cmd.id);
            ExitCode::FAILURE
        }
    }
}
