//! Implementation of `kb add`.

use std::process::ExitCode;

use tracing::debug;

use crate::cli::{args::AddCommand, context::CommandContext, output::dim};

/// Ingests each file, replacing items previously ingested from the same path.
///
/// Every file is attempted; the command fails if any of them could not be added.
pub fn run(ctx: &CommandContext, cmd: &AddCommand) -> ExitCode {
    let kb = match ctx.open_base() {
        Ok(kb) => kb,
        Err(code) => return code,
    };

    let mut failed = 0;
    for path in &cmd.files {
        let path = ctx.cwd.join(path);
        match kb.ingest_path(&path) {
            Ok(item) => {
                debug!(id = %item.id, path = %path.display(), "ingested");
                println!("{} {}", item.id, dim(&item.title));
            }
            Err(e) => {
                eprintln!("error: failed to add {}: {e}", path.display());
                failed += 1;
            }
        }
    }
    kb.close();

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
