//! Implementation of `kb check`.

use std::process::ExitCode;

use kb_config::{ConfigWarning, discover_config_file, is_global_config};

use crate::cli::{
    context::CommandContext,
    output::{dim, subheader, warning},
};

/// Exit codes for `kb check`.
mod exit_codes {
    use std::process::ExitCode;

    /// Configuration is valid with no warnings.
    pub const OK: ExitCode = ExitCode::SUCCESS;
    /// Configuration has warnings but is usable.
    pub const WARNINGS: ExitCode = ExitCode::FAILURE;
}

/// Validates the loaded configuration and reports warnings with hints.
///
/// Unreadable or unparsable configuration fails earlier, while the context loads.
pub fn run(ctx: &CommandContext) -> ExitCode {
    println!("Checking configuration...");
    println!();

    match discover_config_file(&ctx.cwd) {
        Some(path) => {
            println!("{}", subheader("Config file:"));
            if is_global_config(&path) {
                println!("   {} {}", path.display(), dim("(global)"));
            } else {
                println!("   {}", path.display());
            }
        }
        None => println!("{}", dim("No configuration file found, using defaults.")),
    }
    println!();

    let warnings = ctx.config.validate();
    if warnings.is_empty() {
        println!("No issues found.");
        return exit_codes::OK;
    }

    println!("{}", subheader(&format!("Warnings ({}):", warnings.len())));
    for w in &warnings {
        println!("   {}", warning(&w.to_string()));
    }
    println!();

    print_hints(&warnings);

    exit_codes::WARNINGS
}

/// Hint for resolving a warning.
fn hint(w: &ConfigWarning) -> &'static str {
    match w {
        ConfigWarning::WeightsDoNotSumToOne { .. } => {
            "Set [search] keyword_weight and semantic_weight so they add up to 1.0."
        }
        ConfigWarning::OverlapOutOfRange(_) => {
            "Use a [chunking] overlap_ratio of at least 0.0 and below 1.0."
        }
        ConfigWarning::ChunkSizesInverted { .. } => {
            "Make [chunking] min_chunk_size smaller than max_chunk_size."
        }
        ConfigWarning::NonPositiveDivisor(_) => "Use a positive [search] keyword_score_divisor.",
        ConfigWarning::BudgetExceedsParent { .. } => {
            "Keep each [budget] limit within the limit that contains it."
        }
    }
}

/// Prints deduplicated hints for the warnings.
fn print_hints(warnings: &[ConfigWarning]) {
    let mut hints: Vec<&str> = warnings.iter().map(hint).collect();
    hints.sort_unstable();
    hints.dedup();

    if !hints.is_empty() {
        println!("{}", subheader("Hints:"));
        for h in hints {
            println!("   - {h}");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hints_cover_every_warning() {
        let warnings = [
            ConfigWarning::WeightsDoNotSumToOne {
                keyword: 0.5,
                semantic: 0.1,
            },
            ConfigWarning::OverlapOutOfRange(1.5),
            ConfigWarning::ChunkSizesInverted { min: 10, max: 5 },
            ConfigWarning::NonPositiveDivisor(0.0),
            ConfigWarning::BudgetExceedsParent {
                budget: "safe_content_threshold",
                parent: "max_result_content_size",
            },
        ];
        let hints: Vec<&str> = warnings.iter().map(hint).collect();
        assert!(hints.iter().all(|h| !h.is_empty()));
        assert!(hints[0].contains("keyword_weight"));
    }
}
