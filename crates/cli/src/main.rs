// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sw - shardwal administration CLI

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{bookmarks, compact, replay, shards, validate};
use output::OutputFormat;
use std::path::PathBuf;
use sw_storage::WalConfig;

#[derive(Parser)]
#[command(name = "sw", version, about = "shardwal - inspect and maintain a write-ahead log")]
struct Cli {
    /// Config file with a [wal] table
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// WAL directory (overrides the config file)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the records of a shard
    Replay(replay::ReplayArgs),
    /// Check shard logs for corruption
    Validate(validate::ValidateArgs),
    /// Truncate torn or corrupted log tails
    Repair(validate::RepairArgs),
    /// List recorded bookmarks
    Bookmarks,
    /// List shard logs
    Shards,
    /// Remove segments every server has committed
    Compact,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging();

    let config = load_config(cli.config, cli.dir)?;
    match cli.command {
        Commands::Replay(args) => replay::handle(&config, args, cli.format),
        Commands::Validate(args) => validate::validate(&config, args, cli.format),
        Commands::Repair(args) => validate::repair(&config, args, cli.format),
        Commands::Bookmarks => bookmarks::handle(&config, cli.format),
        Commands::Shards => shards::handle(&config, cli.format),
        Commands::Compact => compact::handle(config, cli.format).await,
    }
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<PathBuf>, dir: Option<PathBuf>) -> Result<WalConfig> {
    let mut config = match path {
        Some(path) => WalConfig::load(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => WalConfig::default(),
    };
    if let Some(dir) = dir {
        config.dir = dir;
    }
    Ok(config)
}
