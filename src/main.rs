//! Bar cache CLI application.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use barcache_config::load_config;
use barcache_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging: flags override the config file's [logging] section
    let logging = load_config(&cli.config)
        .map(|config| config.logging)
        .unwrap_or_default();
    let log_level = match cli.log_level {
        Some(cli::LogLevel::Trace) => "trace",
        Some(cli::LogLevel::Debug) => "debug",
        Some(cli::LogLevel::Info) => "info",
        Some(cli::LogLevel::Warn) => "warn",
        Some(cli::LogLevel::Error) => "error",
        None => logging.level.as_str(),
    };
    let json = cli.json_logs || logging.is_json();
    let log_file = cli.log_file.as_deref().or(logging.file.as_deref());
    let _guard = setup_logging(log_level, json, log_file);

    // Execute command
    match cli.command {
        Commands::Init => cli::commands::init::run(&cli.config).await,
        Commands::Import(args) => cli::commands::import::run(args, &cli.config).await,
        Commands::Query(args) => cli::commands::query::run(args, &cli.config).await,
        Commands::Stats(args) => cli::commands::stats::run(args, &cli.config).await,
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config).await,
    }
}
