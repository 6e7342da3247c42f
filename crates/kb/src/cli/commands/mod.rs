//! Command implementations and dispatch.

pub mod add;
pub mod check;
pub mod init;
pub mod rebuild;
pub mod rm;
pub mod search;
pub mod similar;
pub mod status;
pub mod suggest;

use std::process::ExitCode;

use super::{args::Commands, context::CommandContext};

/// Dispatches to the selected subcommand.
pub fn run(command: Commands, ctx: &CommandContext) -> ExitCode {
    match command {
        Commands::Init(cmd) => init::run(ctx, &cmd),
        Commands::Add(cmd) => add::run(ctx, &cmd),
        Commands::Search(cmd) => search::run(ctx, &cmd),
        Commands::Suggest(cmd) => suggest::run(ctx, &cmd),
        Commands::Similar(cmd) => similar::run(ctx, &cmd),
        Commands::Rm(cmd) => rm::run(ctx, &cmd),
        Commands::Rebuild => rebuild::run(ctx),
        Commands::Status => status::run(ctx),
        Commands::Check => check::run(ctx),
    }
}
