//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as human-readable text.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Where a run delivered its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Data was written to standard output.
    Stdout,
    /// Data was written to the `--output` file.
    File,
    /// Data was kept in memory and discarded.
    DryRun,
}

/// Outcome of one command run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Subcommand name.
    pub command: &'static str,
    /// Input file.
    pub file: String,
    /// Logical entries read.
    pub entries: usize,
    /// Events decoded.
    pub events: usize,
    /// Entries skipped.
    pub skipped: usize,
    /// Documents, transactions or printed events delivered.
    pub delivered: usize,
    /// What `delivered` counts.
    pub unit: &'static str,
    /// Bulk requests sent, for the search command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests: Option<usize>,
    /// Errors reported to the trace backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<usize>,
    /// Where the data went.
    pub destination: Destination,
}

impl TableDisplay for RunSummary {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Processed {} events from {}", self.events, self.file)?;
        writeln!(writer, "  Entries:    {}", self.entries)?;
        writeln!(writer, "  Skipped:    {}", self.skipped)?;
        write!(writer, "  Delivered:  {} {}", self.delivered, self.unit)?;
        if let Some(requests) = self.requests {
            write!(writer, " in {requests} request(s)")?;
        }
        writeln!(writer)?;
        if let Some(errors) = self.errors.filter(|e| *e > 0) {
            writeln!(writer, "  Errors:     {errors}")?;
        }
        let destination = match self.destination {
            Destination::Stdout => "stdout",
            Destination::File => "file",
            Destination::DryRun => "dry run (nothing written)",
        };
        writeln!(writer, "  Output:     {destination}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RunSummary {
        RunSummary {
            command: "search",
            file: "25060510.log".into(),
            entries: 3,
            events: 2,
            skipped: 1,
            delivered: 2,
            unit: "document(s)",
            requests: Some(1),
            errors: None,
            destination: Destination::DryRun,
        }
    }

    fn render(format: Format, value: &RunSummary) -> String {
        let mut buf = Vec::new();
        OutputFormat::new(format)
            .write(&mut buf, value)
            .expect("write");
        String::from_utf8(buf).expect("utf-8")
    }

    #[test]
    fn table_summary() {
        let text = render(Format::Table, &summary());
        assert!(text.starts_with("Processed 2 events from 25060510.log"));
        assert!(text.contains("Skipped:    1"));
        assert!(text.contains("2 document(s) in 1 request(s)"));
        assert!(text.contains("dry run"));
        assert!(!text.contains("Errors"));
    }

    #[test]
    fn json_summary() {
        let text = render(Format::Json, &summary());
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value["command"], "search");
        assert_eq!(value["delivered"], 2);
        assert_eq!(value["destination"], "dry_run");
        assert!(value.get("errors").is_none());
    }

    #[test]
    fn default_is_table() {
        assert!(!OutputFormat::default().is_json());
        assert!(OutputFormat::new(Format::Json).is_json());
    }
}
