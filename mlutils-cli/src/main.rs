//! mlutils CLI: compute, inspect and verify nested cross-validation split files.

mod commands;

use clap::Parser;
use mlutils_core::SplitterKind;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// mlutils: reproducible train/validation/test splits
#[derive(Parser, Debug)]
#[command(name = "mlutils", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Compute a split assignment and write it to a split file
    Split(SplitArgs),
    /// Print fold counts and partition sizes of a split file
    Show {
        /// Split file (.yaml or .json)
        file: PathBuf,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Verify that a split file is well formed and leak free
    Check {
        /// Split file (.yaml or .json)
        file: PathBuf,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options for `mlutils split`. Anything left unset comes from configuration.
#[derive(clap::Args, Debug, Default)]
struct SplitArgs {
    /// Nesting scheme: holdout, cv-holdout, nested-holdout, nested-cv
    #[arg(short, long)]
    strategy: Option<SplitterKind>,

    /// Outer k-fold count
    #[arg(long)]
    outer_folds: Option<usize>,

    /// Inner k-fold count
    #[arg(long)]
    inner_folds: Option<usize>,

    /// Holdout fraction
    #[arg(long)]
    test_size: Option<f64>,

    /// Preserve class proportions (requires --labels)
    #[arg(long)]
    stratified: bool,

    /// Shuffle before k-fold partitioning
    #[arg(long)]
    shuffle: bool,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Split the indices 0..N
    #[arg(short = 'n', long, conflicts_with = "indices")]
    num_items: Option<usize>,

    /// File with one index per line
    #[arg(long)]
    indices: Option<PathBuf>,

    /// File with one class label per line, aligned with the indices
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Output split file (defaults to data.splits_path)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default configuration file
    Init,
    /// Show current configuration
    Show,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let _guard = init_tracing(cli.verbose, cli.quiet);

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.config.as_deref())
}

fn log_level(verbose: u8, quiet: bool) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn log_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "mlutils", "mlutils")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Human-readable stderr at the requested level, plus a daily JSON log at debug.
/// The returned guard flushes the file writer when dropped.
fn init_tracing(verbose: u8, quiet: bool) -> WorkerGuard {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(log_level(verbose, quiet)));

    let dir = log_dir();
    let _ = std::fs::create_dir_all(&dir);
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
        &dir,
        "mlutils.log",
    ));
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(writer)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();
    guard
}
