//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Ship 1C:Enterprise technology logs to search and tracing backends.
#[derive(Parser, Debug, Clone)]
#[command(name = "techlog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "TECHLOG_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Format of diagnostic logs written to stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    /// Format of the run summary.
    #[arg(short, long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Summary output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable text.
    #[default]
    Table,
    /// JSON for scripting.
    Json,
}

/// Diagnostic log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Plain text lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Index a log file into the search store.
    Search(SearchArgs),

    /// Record a log file as trace transactions.
    Trace(TraceArgs),

    /// Decode a log file and print events as JSON lines.
    Parse(ParseArgs),
}

/// Arguments for the search command.
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Log file named `YYMMDDHH.log`.
    pub log: PathBuf,

    /// Write bulk request bodies here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Target index.
    #[arg(long, env = "TECHLOG_INDEX")]
    pub index: Option<String>,

    /// Documents per bulk request.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Index into memory and only print the summary.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the trace command.
#[derive(Args, Debug, Clone)]
pub struct TraceArgs {
    /// Log file named `YYMMDDHH.log`.
    pub log: PathBuf,

    /// Write trace events here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Service name reported with every transaction.
    #[arg(long, env = "TECHLOG_SERVICE_NAME")]
    pub service_name: Option<String>,

    /// Deployment environment.
    #[arg(long, env = "TECHLOG_ENVIRONMENT")]
    pub environment: Option<String>,

    /// Record into memory and only print the summary.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the parse command.
#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    /// Log file named `YYMMDDHH.log`.
    pub log: PathBuf,
}
