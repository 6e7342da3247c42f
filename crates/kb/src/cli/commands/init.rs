//! Implementation of `kb init`.

use std::{
    fs,
    io::{self, Write},
    path::Path,
    process::ExitCode,
};

use kb_config::{CONFIG_FILENAME, local_template};

use crate::cli::{args::InitCommand, context::CommandContext, output::subheader};

/// Directory holding the index and store, ignored by git.
const DATA_PATTERN: &str = ".kb/";

/// Writes a commented `.kb.toml` template into the current directory.
pub fn run(ctx: &CommandContext, cmd: &InitCommand) -> ExitCode {
    let config_path = ctx.cwd.join(CONFIG_FILENAME);

    if config_path.exists() && !cmd.force {
        eprintln!(
            "error: configuration file already exists: {}",
            config_path.display()
        );
        eprintln!("use --force to overwrite");
        return ExitCode::FAILURE;
    }

    let template = local_template();
    if let Err(e) = fs::write(&config_path, &template) {
        eprintln!("error: failed to write {}: {e}", config_path.display());
        return ExitCode::FAILURE;
    }

    println!("Created {}", config_path.display());
    println!();
    println!("{}", subheader("Configuration written:"));
    for line in template.lines() {
        println!("   {line}");
    }

    if let Err(e) = update_gitignore(&ctx.cwd) {
        eprintln!("warning: could not update .gitignore: {e}");
    }

    ExitCode::SUCCESS
}

/// Adds `.kb/` to `.gitignore` in `dir` if the file exists and doesn't already list it.
fn update_gitignore(dir: &Path) -> io::Result<()> {
    let gitignore_path = dir.join(".gitignore");
    if !gitignore_path.exists() {
        return Ok(());
    }

    let contents = fs::read_to_string(&gitignore_path)?;
    let listed = contents
        .lines()
        .map(str::trim)
        .any(|line| line == DATA_PATTERN || line == ".kb");
    if listed {
        return Ok(());
    }

    let mut file = fs::OpenOptions::new().append(true).open(&gitignore_path)?;
    if !contents.is_empty() && !contents.ends_with('\n') {
        writeln!(file)?;
    }
    writeln!(file, "{DATA_PATTERN}")?;
    println!("Added {DATA_PATTERN} to .gitignore");

    Ok(())
}
