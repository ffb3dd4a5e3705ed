//! CLI frontend for the dialogue flow engine.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "df",
    about = "Check, inspect, and play branching dialogue graphs",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log engine transitions to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every node and every reference between nodes
    Check {
        /// Dialogue file or directory of .json files (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Entry node; nodes unreachable from every entry are reported
        #[arg(short, long = "entry")]
        entries: Vec<String>,
    },

    /// Show a single node
    Show {
        /// Node id
        id: String,

        /// Dialogue file or directory of .json files
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },

    /// List every edge between nodes
    Graph {
        /// Dialogue file or directory of .json files
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },

    /// Play a conversation interactively on the terminal
    Play {
        /// Node to start at
        start: String,

        /// Dialogue file or directory of .json files
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Story flag to set before starting (repeatable)
        #[arg(short, long = "flag")]
        flags: Vec<String>,

        /// Advance auto-continue lines immediately instead of waiting
        #[arg(long)]
        no_wait: bool,

        /// Playback speed; 2.0 halves every auto-continue delay
        #[arg(long, default_value = "1.0")]
        speed: f64,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Check { path, entries } => commands::check::run(&path, &entries),
        Commands::Show { id, path } => commands::show::run(&path, &id),
        Commands::Graph { path } => commands::graph::run(&path),
        Commands::Play {
            start,
            path,
            flags,
            no_wait,
            speed,
        } => commands::play::run(&path, &start, &flags, no_wait, speed),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
