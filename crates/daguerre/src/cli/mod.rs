//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the daguerre binary.

mod commands;
mod handlers;

pub use commands::{Cli, Commands, TransformArgs};
pub use handlers::{ingest_file, print_stats, read_to_file};
