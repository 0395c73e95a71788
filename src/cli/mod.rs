//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "barcache")]
#[command(author, version, about = "Two-tier cache for multi-provider OHLCV bars")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "BARCACHE_CONFIG", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log level [default: logging.level from config]
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    /// Write logs to this file instead of stderr [default: logging.file]
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply migrations and verify the durable schema
    Init,
    /// Store bars from a CSV file
    Import(ImportArgs),
    /// Read a range of bars through the cache
    Query(QueryArgs),
    /// Show durable tier row counts
    Stats(StatsArgs),
    /// Validate configuration
    ValidateConfig,
}

#[derive(clap::Args)]
pub struct ImportArgs {
    /// CSV file with Date,Open,High,Low,Close,Volume columns
    #[arg(short, long)]
    pub file: PathBuf,

    /// Symbol the bars belong to
    #[arg(short, long)]
    pub symbol: String,

    /// Timeframe
    #[arg(short, long, default_value = "1d")]
    pub timeframe: String,

    /// Provider the bars came from
    #[arg(short, long)]
    pub provider: String,

    /// Revision of this delivery
    #[arg(short, long, default_value = "1")]
    pub revision: u32,
}

#[derive(clap::Args)]
pub struct QueryArgs {
    /// Symbol to read
    #[arg(short, long)]
    pub symbol: String,

    /// Timeframe
    #[arg(short, long, default_value = "1d")]
    pub timeframe: String,

    /// Start (YYYY-MM-DD or RFC 3339), inclusive
    #[arg(long)]
    pub start: String,

    /// End (YYYY-MM-DD or RFC 3339), exclusive
    #[arg(long)]
    pub end: String,

    /// Print bars as JSON
    #[arg(long)]
    pub json: bool,

    /// CSV file to fetch from when the cache is incomplete
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Provider name for bars fetched from --csv
    #[arg(long, default_value = "csv")]
    pub provider: String,
}

#[derive(clap::Args)]
pub struct StatsArgs {
    /// Break counts down by provider for this symbol
    #[arg(short, long)]
    pub symbol: Option<String>,

    /// Timeframe used with --symbol
    #[arg(short, long, default_value = "1d")]
    pub timeframe: String,
}
