//! Grouping of physical lines into logical entries.
//!
//! A techlog entry starts with `MM:SS.mmmmmm-` and continues until the next
//! line carrying that marker. Multi-line payloads (SQL text, stack contexts)
//! are glued back together with `\n`, so the entry text is exactly what the
//! platform wrote.

use std::io;

use once_cell::sync::Lazy;
use regex::Regex;

/// Start-of-entry marker: two-digit minute, two-digit second, six-digit
/// microseconds, hyphen.
static ENTRY_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{2}:[0-9]{2}\.[0-9]{6}-").unwrap_or_else(|_| unreachable!()));

/// Returns true if the line opens a new logical entry.
#[must_use]
pub fn is_entry_start(line: &str) -> bool {
    ENTRY_MARKER.is_match(line)
}

/// Lazy iterator of logical entries over an iterator of physical lines.
///
/// Lines are expected without their terminators, as produced by
/// [`std::io::BufRead::lines`]. Read errors are passed through unchanged.
pub struct EntryReassembler<I> {
    lines: I,
    pending: Option<String>,
    seen_marker: bool,
    skip_leading_blank_lines: bool,
    done: bool,
}

impl<I> EntryReassembler<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    /// Creates a reassembler that keeps every line.
    pub const fn new(lines: I) -> Self {
        Self {
            lines,
            pending: None,
            seen_marker: false,
            skip_leading_blank_lines: false,
            done: false,
        }
    }

    /// Drops empty lines that appear before the first entry marker.
    #[must_use]
    pub const fn skip_leading_blank_lines(mut self, skip: bool) -> Self {
        self.skip_leading_blank_lines = skip;
        self
    }
}

impl<'a> EntryReassembler<std::iter::Map<std::str::Lines<'a>, fn(&'a str) -> io::Result<String>>> {
    /// Creates a reassembler over in-memory text.
    pub fn from_text(text: &'a str) -> Self {
        let owned: fn(&'a str) -> io::Result<String> = |line| Ok(line.to_string());
        EntryReassembler::new(text.lines().map(owned))
    }
}

impl<I> Iterator for EntryReassembler<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(err)) => return Some(Err(err)),
                None => {
                    self.done = true;
                    return self.pending.take().map(Ok);
                }
            };

            if is_entry_start(&line) {
                self.seen_marker = true;
                if let Some(finished) = self.pending.replace(line) {
                    return Some(Ok(finished));
                }
                continue;
            }

            if !self.seen_marker && self.skip_leading_blank_lines && line.is_empty() {
                continue;
            }

            match self.pending.as_mut() {
                Some(buffer) => {
                    buffer.push('\n');
                    buffer.push_str(&line);
                }
                None => self.pending = Some(line),
            }
        }
    }
}
