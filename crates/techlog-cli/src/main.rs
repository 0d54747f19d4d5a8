//! Techlog CLI binary entrypoint.
//!
//! This is the main entry point for the `techlog` command-line tool.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use techlog_cli::cli::{Cli, Commands, LogFormat};
use techlog_cli::commands::{ParseCommand, SearchCommand, TraceCommand, load_config};
use techlog_cli::output::{OutputFormat, RunSummary};

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "techlog=info,techlog_cli=info";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().flatten_event(true).init(),
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    let summary = match &cli.command {
        Commands::Search(args) => SearchCommand::new(&config)
            .execute(&mut stdout, args)
            .with_context(|| format!("search failed for {}", args.log.display()))?,
        Commands::Trace(args) => TraceCommand::new(&config)
            .execute(&mut stdout, args)
            .with_context(|| format!("trace failed for {}", args.log.display()))?,
        Commands::Parse(args) => ParseCommand::new(&config)
            .execute(&mut stdout, args)
            .with_context(|| format!("parse failed for {}", args.log.display()))?,
    };
    stdout.flush()?;
    drop(stdout);

    report(&format, &summary)
}

/// Prints the summary to stdout, or to stderr when stdout carried the data.
fn report(format: &OutputFormat, summary: &RunSummary) -> anyhow::Result<()> {
    use techlog_cli::output::Destination;

    if summary.destination == Destination::Stdout {
        format.write(&mut io::stderr().lock(), summary)?;
    } else {
        format.write(&mut io::stdout().lock(), summary)?;
    }
    Ok(())
}
