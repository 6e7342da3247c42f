//! Rendering and JSON serialization for CLI output.

use std::process::ExitCode;

use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use kb_search::{SearchResult, SearchResults, truncate_chars};
use serde::Serialize;

/// ANSI escape codes used for terminal styling.
mod colors {
    /// Reset all styles.
    pub const RESET: &str = "\x1b[0m";
    /// Bold text.
    pub const BOLD: &str = "\x1b[1m";
    /// Dimmed text.
    pub const DIM: &str = "\x1b[2m";
    /// Yellow foreground.
    pub const YELLOW: &str = "\x1b[33m";
}

/// Characters of chunk or item content shown per result row.
const SNIPPET_CHARS: usize = 160;

/// Formats text as a subheader (bold).
pub fn subheader(text: &str) -> String {
    format!("{}{}{}", colors::BOLD, text, colors::RESET)
}

/// Formats text as dimmed.
pub fn dim(text: &str) -> String {
    format!("{}{}{}", colors::DIM, text, colors::RESET)
}

/// Formats text as a warning (yellow).
pub fn warning(text: &str) -> String {
    format!("{}{}{}", colors::YELLOW, text, colors::RESET)
}

/// Prints `value` as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to serialize JSON: {e}");
            ExitCode::FAILURE
        }
    }
}

/// A fresh table with the shared preset.
pub fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(Cell::new));
    table
}

/// One-line preview of text, with whitespace collapsed.
fn snippet(text: &str) -> String {
    let mut collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if truncate_chars(&mut collapsed, SNIPPET_CHARS) {
        collapsed.push_str("...");
    }
    collapsed
}

/// The best preview for a result: its top matched chunk, else the item content.
fn result_snippet(result: &SearchResult) -> String {
    match result.matched_chunks.first() {
        Some(chunk) if !chunk.heading.is_empty() => {
            format!("{}: {}", chunk.heading, snippet(&chunk.content))
        }
        Some(chunk) => snippet(&chunk.content),
        None => snippet(&result.item.content),
    }
}

/// Renders results as a table.
pub fn results_table(results: &[SearchResult]) -> Table {
    let mut table = table(&["Score", "ID", "Title", "Matched", "Preview"]);
    for result in results {
        table.add_row(vec![
            Cell::new(format!("{:.3}", result.relevance_score)),
            Cell::new(&result.item.id),
            Cell::new(&result.item.title),
            Cell::new(result.matched_fields.join(", ")),
            Cell::new(result_snippet(result)),
        ]);
    }
    table
}

/// Prints a search response for humans.
pub fn print_search_results(results: &SearchResults) {
    if results.results.is_empty() {
        println!("{}", dim("No results found."));
        return;
    }

    println!("{}", results_table(&results.results));
    println!(
        "{}",
        dim(&format!(
            "{} of {} results, {} strategy, {} ms",
            results.results.len(),
            results.total_found,
            results.strategy.as_str(),
            results.search_time_ms
        ))
    );

    if let Some(grouped) = &results.grouped_results {
        for (category, members) in grouped {
            println!();
            println!("{}", subheader(&format!("{category} ({})", members.len())));
            println!("{}", results_table(members));
        }
    }
}
