//! Implementation of `kb status`.

use std::process::ExitCode;

use comfy_table::Cell;
use kb_config::{discover_config_file, is_global_config};
use kb_index::{IndexStatus, detect_index_statuses, index_directory};
use kb_search::store_path;

use crate::cli::{
    context::CommandContext,
    output::{dim, subheader, table, warning},
};

/// Shows the config file, index and store locations, and knowledge base counts.
pub fn run(ctx: &CommandContext) -> ExitCode {
    let config = &ctx.config;

    println!("{}", subheader("Config file:"));
    match discover_config_file(&ctx.cwd) {
        Some(path) if is_global_config(&path) => {
            println!("   {} {}", path.display(), dim("(global)"));
        }
        Some(path) => println!("   {}", path.display()),
        None => println!("   {}", dim("(none, using defaults)")),
    }
    println!();

    let index_dir = index_directory(config);
    let statuses = detect_index_statuses(&index_dir);
    println!("{}", subheader("Indexes:"));
    println!(
        "   documents: {} {}",
        describe(statuses.documents),
        dim(&format!("({})", index_dir.display()))
    );
    println!("   chunks:    {}", describe(statuses.chunks));
    println!();

    let store = store_path(config);
    println!("{}", subheader("Store:"));
    if !store.exists() {
        println!("   {} {}", dim("(empty)"), dim(&format!("({})", store.display())));
        println!();
        println!("Run {} to ingest files.", subheader("kb add <files>"));
        return ExitCode::SUCCESS;
    }
    println!("   {}", store.display());
    println!();

    let kb = match ctx.open_base() {
        Ok(kb) => kb,
        Err(code) => return code,
    };
    let stats = match kb.stats() {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("error: failed to read knowledge base: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut counts = table(&["", "Documents", "Chunks"]);
    counts.add_row(vec![
        Cell::new("stored"),
        Cell::new(stats.items),
        Cell::new(stats.chunks),
    ]);
    counts.add_row(vec![
        Cell::new("keyword index"),
        Cell::new(stats.indexed_documents),
        Cell::new(stats.indexed_chunks),
    ]);
    counts.add_row(vec![
        Cell::new("semantic index"),
        Cell::new(fitted(stats.semantic_documents_fitted)),
        Cell::new(fitted(stats.semantic_chunks_fitted)),
    ]);
    println!("{counts}");
    println!("{}", dim(&format!("vocabulary: {} terms", stats.vocabulary_size)));

    ExitCode::SUCCESS
}

/// Index status text, highlighted when the index is unusable.
fn describe(status: IndexStatus) -> String {
    match status {
        IndexStatus::Ready(_) => status.description(),
        IndexStatus::Missing | IndexStatus::Empty => warning(&status.description()),
    }
}

/// Semantic index state label.
fn fitted(is_fitted: bool) -> &'static str {
    if is_fitted { "fitted" } else { "not fitted" }
}
