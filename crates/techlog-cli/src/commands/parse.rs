//! Parse command implementation.
//!
//! Decodes a file and prints every event as one JSON line.

use std::io::Write;

use techlog::{EventSink, ParsedEvent, Result as PipelineResult, TechLogConfig, ingest_file};

use crate::cli::ParseArgs;
use crate::error::CliError;
use crate::output::{Destination, RunSummary};

use super::display_name;

/// Sink printing events as JSON lines.
struct JsonLines<W> {
    writer: W,
}

impl<W: Write> EventSink for JsonLines<W> {
    fn accept(&mut self, event: &ParsedEvent) -> PipelineResult<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> PipelineResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Handler for the parse command.
pub struct ParseCommand<'a> {
    config: &'a TechLogConfig,
}

impl<'a> ParseCommand<'a> {
    /// Creates a new parse command handler.
    #[must_use]
    pub const fn new(config: &'a TechLogConfig) -> Self {
        Self { config }
    }

    /// Executes the parse command.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or output fails.
    pub fn execute<W: Write>(&self, out: &mut W, args: &ParseArgs) -> Result<RunSummary, CliError> {
        let mut sink = JsonLines { writer: out };
        let stats = ingest_file(&args.log, self.config.reader, &mut sink)?;

        Ok(RunSummary {
            command: "parse",
            file: display_name(&args.log),
            entries: stats.entries,
            events: stats.events,
            skipped: stats.skipped(),
            delivered: stats.events,
            unit: "event(s)",
            requests: None,
            errors: None,
            destination: Destination::Stdout,
        })
    }
}
