//! Command-line interface for exam-forge.
//!
//! Provides commands for batch generation, pre-flight validation, compiler
//! checks and listing stored templates and rosters.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
