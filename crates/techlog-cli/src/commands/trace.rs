//! Trace command implementation.
//!
//! Records one techlog file as transactions, writing trace intake events or
//! keeping them in memory for a dry run.

use std::io::Write;

use tracing::info;

use techlog::{
    IntakeFileBackend, MemoryTraceBackend, TechLogConfig, TraceAdapter, ingest_file,
};

use crate::cli::TraceArgs;
use crate::error::CliError;
use crate::output::{Destination, RunSummary};

use super::{display_name, open_sink};

/// Handler for the trace command.
pub struct TraceCommand<'a> {
    config: &'a TechLogConfig,
}

impl<'a> TraceCommand<'a> {
    /// Creates a new trace command handler.
    #[must_use]
    pub const fn new(config: &'a TechLogConfig) -> Self {
        Self { config }
    }

    /// Executes the trace command.
    ///
    /// Intake events go to `--output` when given, to `out` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are invalid or the pipeline fails.
    /// Events recorded before a failure are still flushed.
    pub fn execute<W: Write>(&self, out: &mut W, args: &TraceArgs) -> Result<RunSummary, CliError> {
        let mut trace = self.config.trace.clone();
        if let Some(service_name) = &args.service_name {
            trace.service_name.clone_from(service_name);
        }
        if let Some(environment) = &args.environment {
            trace.environment.clone_from(environment);
        }
        let config = TechLogConfig {
            trace,
            ..self.config.clone()
        };
        config.validate()?;
        let options = config.trace_options()?;

        let (stats, delivered, errors, destination) = if args.dry_run {
            let backend = MemoryTraceBackend::new(config.trace.max_spans);
            let recording = backend.recording();
            let mut adapter = TraceAdapter::new(backend, options);
            let stats = ingest_file(&args.log, config.reader, &mut adapter)?;
            let delivered = recording.transactions().len();
            info!(transactions = delivered, "dry run, transactions discarded");
            (stats, delivered, recording.errors().len(), Destination::DryRun)
        } else {
            let (writer, destination) = open_sink(args.output.as_deref(), out)?;
            let backend = IntakeFileBackend::new(
                writer,
                &config.trace.service_name,
                &config.trace.environment,
                config.trace.max_spans,
            )?;
            let mut adapter = TraceAdapter::new(backend, options);
            let stats = ingest_file(&args.log, config.reader, &mut adapter)?;
            let delivered = adapter.backend().transactions();
            let errors = adapter.backend().errors();
            (stats, delivered, errors, destination)
        };

        Ok(RunSummary {
            command: "trace",
            file: display_name(&args.log),
            entries: stats.entries,
            events: stats.events,
            skipped: stats.skipped(),
            delivered,
            unit: "transaction(s)",
            requests: None,
            errors: Some(errors),
            destination,
        })
    }
}
