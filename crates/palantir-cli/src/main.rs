use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod shutdown;

#[derive(Parser)]
#[command(name = "palantir")]
#[command(about = "Live character introspection for the running game client")]
struct Args {
    /// Game install directory containing the client .dat archives
    #[arg(short, long, env = "PALANTIR_GAME_PATH")]
    game_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract one snapshot of the current character
    Snapshot {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep extracting on an interval, reporting changes
    Watch {
        /// Poll interval in seconds
        #[arg(short, long, default_value_t = 30)]
        interval: u64,
        /// Print snapshots as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Search the property registry by keyword
    Properties {
        keyword: String,
        /// Maximum number of results
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Dump every raw property on the player entity
    Dump,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("palantir_core=info".parse()?)
                .add_directive("palantir_cli=info".parse()?),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Snapshot { json } => commands::snapshot::run(&args.game_path, json),
        Command::Watch { interval, json } => commands::watch::run(&args.game_path, interval, json),
        Command::Properties { keyword, limit } => {
            commands::properties::run(&args.game_path, &keyword, limit)
        }
        Command::Dump => commands::dump::run(&args.game_path),
    }
}
