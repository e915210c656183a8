//! CLI for asmetrics: Apple Silicon power and utilization from powermetrics.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "asmetrics")]
#[command(about = "asmetrics: Apple Silicon power, thermal and utilization telemetry")]
#[command(version = asmetrics_core::VERSION)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the detected chip, core topology and power/bandwidth ceilings
    Info {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show RAM and swap usage
    Memory {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Decode the newest complete record of an existing sampler output file
    Read {
        /// Path to a powermetrics plist output file
        path: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Start powermetrics and print one snapshot per interval
    Watch {
        /// Sample interval in milliseconds
        #[arg(long)]
        interval: Option<u64>,

        /// nice increment for the sampler process
        #[arg(long)]
        nice: Option<i32>,

        /// Output file slot (0 or 1)
        #[arg(long)]
        timecode: Option<asmetrics_core::Timecode>,

        /// Output path prefix (the timecode digit is appended)
        #[arg(long)]
        base_path: Option<PathBuf>,

        /// Run powermetrics directly instead of through sudo (requires root)
        #[arg(long)]
        no_sudo: bool,

        /// JSON configuration file; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Stop after this many snapshots (0 = until Ctrl-C)
        #[arg(long, default_value = "0")]
        count: u64,

        /// Print JSON lines instead of text
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Info { json } => commands::info::run(json),
        Commands::Memory { json } => commands::memory::run(json),
        Commands::Read { path, json } => commands::read::run(&path, json),
        Commands::Watch {
            interval,
            nice,
            timecode,
            base_path,
            no_sudo,
            config,
            count,
            json,
        } => commands::watch::run(commands::watch::WatchCommandConfig {
            config_path: config.as_deref(),
            interval_ms: interval,
            nice,
            timecode,
            base_path,
            no_sudo,
            count,
            json,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(if e.is_permission_denied() { 2 } else { 1 });
    }
}
