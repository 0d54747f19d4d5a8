//! Ingest pipeline: one techlog file in, events out to a sink.
//!
//! The pipeline resolves the file's hour from its name, groups physical
//! lines into entries, decodes each entry and hands the events to an
//! [`EventSink`]. Entries that cannot be decoded are logged and skipped;
//! I/O and sink failures abort the file.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::decoder::EntryDecoder;
use crate::error::Result;
use crate::filename::DateContext;
use crate::reassembler::EntryReassembler;
use crate::traits::EventSink;

const BOM: char = '\u{feff}';

/// Options for reading entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderOptions {
    /// Drop empty lines that precede the first entry.
    #[serde(default)]
    pub skip_leading_blank_lines: bool,
}

/// Counters for one ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Logical entries read.
    pub entries: usize,
    /// Events handed to the sink.
    pub events: usize,
    /// Entries that did not match the grammar or carried an impossible time.
    pub decode_skipped: usize,
    /// Entries with an unusable duration or row count.
    pub validation_skipped: usize,
}

impl IngestStats {
    /// Returns the number of entries dropped for any reason.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.decode_skipped + self.validation_skipped
    }
}

/// Runs every entry of `reader` through `sink`, then finishes the sink.
///
/// # Errors
///
/// Returns the first read or sink error. The sink is not finished in that case.
pub fn ingest_reader<R, S>(
    reader: R,
    context: DateContext,
    options: ReaderOptions,
    sink: &mut S,
) -> Result<IngestStats>
where
    R: BufRead,
    S: EventSink + ?Sized,
{
    let decoder = EntryDecoder::new(context);
    let mut first = true;
    let lines = reader.lines().map(move |line: io::Result<String>| -> io::Result<String> {
        let line = line?;
        if std::mem::take(&mut first) {
            if let Some(stripped) = line.strip_prefix(BOM) {
                return Ok(stripped.to_string());
            }
        }
        Ok(line)
    });
    let entries =
        EntryReassembler::new(lines).skip_leading_blank_lines(options.skip_leading_blank_lines);

    let mut stats = IngestStats::default();
    for entry in entries {
        let entry = entry?;
        stats.entries += 1;

        match decoder.decode(&entry) {
            Ok(event) => {
                sink.accept(&event)?;
                stats.events += 1;
            }
            Err(reason) => {
                if reason.is_decode_skip() {
                    stats.decode_skipped += 1;
                } else {
                    stats.validation_skipped += 1;
                }
                warn!(
                    entry = stats.entries,
                    reason = %reason,
                    text = %preview(&entry),
                    "skipping unparsable entry"
                );
            }
        }
    }

    sink.finish()?;
    Ok(stats)
}

/// Resolves the hour from the file name and ingests the file.
///
/// # Errors
///
/// Returns an error if the name carries no `YYMMDDHH` prefix, the file cannot
/// be read, or the sink fails.
pub fn ingest_file<S>(path: &Path, options: ReaderOptions, sink: &mut S) -> Result<IngestStats>
where
    S: EventSink + ?Sized,
{
    let context = DateContext::from_path(path)?;
    info!(file = %path.display(), hour = %context, "processing log file");

    let reader = BufReader::new(File::open(path)?);
    let stats = ingest_reader(reader, context, options, sink)?;

    info!(
        file = %path.display(),
        events = stats.events,
        skipped = stats.skipped(),
        "finished log file"
    );
    Ok(stats)
}

fn preview(entry: &str) -> &str {
    const MAX: usize = 120;
    let line = entry.lines().next().unwrap_or_default();
    match line.char_indices().nth(MAX) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}
