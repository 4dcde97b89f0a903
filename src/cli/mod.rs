//! CLI module
//!
//! Command-line interface for one replace-load run.
//!
//! # Usage
//!
//! `sf2cdp <database> <schema> <table> <env> [options]`
//!
//! - `--plan` - print the resolved names and statements, execute nothing
//! - `--config` - YAML settings file

mod commands;
mod runner;

pub use commands::Cli;
pub use runner::Runner;
