//! CLI arguments

use crate::config::{RelocationMode, RelocatorBackend};
use clap::Parser;
use std::path::PathBuf;

/// Replace-load a Snowflake table into BigQuery through GCS
#[derive(Parser, Debug)]
#[command(name = "sf2cdp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source database
    pub database: String,

    /// Source schema
    pub schema: String,

    /// Source table
    pub table: String,

    /// Environment tag (dev, qa, prod, ...)
    pub env: String,

    /// Settings file (YAML)
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Maximum number of files sampled for schema inference
    #[arg(long)]
    pub file_limit: Option<usize>,

    /// Maximum number of lines sampled per file
    #[arg(long)]
    pub line_limit: Option<usize>,

    /// Move or copy files between buckets
    #[arg(long)]
    pub relocation: Option<RelocationMode>,

    /// Mechanism used to relocate files
    #[arg(long)]
    pub relocator: Option<RelocatorBackend>,

    /// Print the resolved plan as JSON and exit
    #[arg(long)]
    pub plan: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
