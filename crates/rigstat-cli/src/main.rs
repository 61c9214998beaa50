//! CLI for rigstat: replay recorded rig telemetry and inspect benchmark statistics.

mod commands;

use clap::{Parser, Subcommand};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "rigstat")]
#[command(about = "rigstat: benchmark bookkeeping and hash-rate statistics for mining rigs")]
#[command(version = rigstat_core::VERSION)]
struct Cli {
    /// Log engine activity at debug level (RUST_LOG still applies)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed recorded telemetry frames (JSON lines) through a rig and summarize
    Replay {
        /// Newline-delimited JSON file, one `{ "batch": ..., "latency": [...] }` per line
        frames: String,

        /// Engine configuration JSON (defaults apply to missing fields)
        #[arg(long)]
        config: Option<String>,

        /// Write the full rig state as pretty JSON
        #[arg(long)]
        output: Option<String>,

        /// Only report the device on this bus index
        #[arg(long)]
        device: Option<i32>,
    },

    /// Show the sessions stored in a rig state file written by `replay --output`
    Inspect {
        /// Rig state JSON file
        state: String,

        /// Print the full sigma percentile ladder of each latest snapshot
        #[arg(long)]
        percentiles: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Replay {
            frames,
            config,
            output,
            device,
        } => commands::replay::run(commands::replay::ReplayCommandConfig {
            frames_path: &frames,
            config_path: config.as_deref(),
            output_path: output.as_deref(),
            device,
        }),
        Commands::Inspect { state, percentiles } => commands::inspect::run(&state, percentiles),
    }
}
