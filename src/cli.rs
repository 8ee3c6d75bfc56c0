//! CLI definitions for the shameboard binary.

use clap::Parser;

/// Shameboard task board server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long)]
    pub database: Option<String>,

    /// Port for the board UI and task API (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Default webhook target (overrides config)
    #[arg(long)]
    pub webhook_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2")]
    pub log: String,
}
