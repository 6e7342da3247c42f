//! Argument parsing, per-invocation context, command implementations and output rendering.

pub mod args;
pub mod commands;
pub mod context;
pub mod output;
