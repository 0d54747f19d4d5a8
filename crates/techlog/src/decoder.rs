//! Decoding of logical entries into [`ParsedEvent`]s.
//!
//! An entry looks like
//!
//! ```text
//! 10:15.123456-5000,DBPOSTGRS,3,process=rphost,Usr=admin,Sql="SELECT 1"
//! ```
//!
//! i.e. `MM:SS.micro-duration,event,level,` followed by a property list
//! handled by [`crate::tokenizer`]. The property list may span several
//! physical lines.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::SkipReason;
use crate::filename::DateContext;
use crate::tokenizer;
use crate::types::ParsedEvent;

/// Fixed prefix followed by a free-form, possibly multi-line, suffix.
///
/// The duration group is loose so that a malformed duration is reported as
/// [`SkipReason::InvalidDuration`] rather than as a grammar mismatch.
static ENTRY_GRAMMAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^([0-9]{2}):([0-9]{2})\.([0-9]{6})-([^,]*),([^,]+),([0-9]+),(.+)$")
        .unwrap_or_else(|_| unreachable!())
});

/// Property carrying nested call parameters.
const PARAMETERS_KEY: &str = "Prm";

/// Decoder bound to the date context of one file.
#[derive(Debug, Clone, Copy)]
pub struct EntryDecoder {
    context: DateContext,
}

impl EntryDecoder {
    /// Creates a decoder for entries of the given hour.
    #[must_use]
    pub const fn new(context: DateContext) -> Self {
        Self { context }
    }

    /// Returns the date context entries are resolved against.
    #[must_use]
    pub const fn context(&self) -> DateContext {
        self.context
    }

    /// Decodes one logical entry.
    ///
    /// # Errors
    ///
    /// Returns a [`SkipReason`] when the entry cannot produce a complete
    /// event. No partial event is ever returned.
    pub fn decode(&self, entry: &str) -> Result<ParsedEvent, SkipReason> {
        let caps = ENTRY_GRAMMAR.captures(entry).ok_or(SkipReason::NoMatch)?;
        let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());

        // The grammar guarantees fixed-width digit groups.
        let number = |i: usize| group(i).parse::<u32>().unwrap_or_default();
        let (minute, second, micros) = (number(1), number(2), number(3));
        let timestamp = self
            .context
            .timestamp(minute, second, micros)
            .ok_or(SkipReason::InvalidTimestamp {
                minute,
                second,
                micros,
            })?;

        let duration_us = group(4)
            .parse::<u64>()
            .map_err(|_| SkipReason::InvalidDuration(group(4).to_string()))?;

        let mut event = ParsedEvent::new(timestamp, duration_us, group(5), group(6));
        let mut raw_rows = None;
        for (key, value) in tokenizer::pairs(group(7)) {
            match key {
                PARAMETERS_KEY => event.parameters = tokenizer::parse_pairs(value),
                "RowsAffected" => raw_rows = Some(value),
                _ => project(&mut event, key, value),
            }
        }

        if let Some(raw) = raw_rows {
            let rows = raw
                .parse::<i64>()
                .map_err(|_| SkipReason::InvalidRowsAffected(raw.to_string()))?;
            event.rows_affected = Some(rows);
        }

        Ok(event)
    }
}

/// Stores a known property on the event. Unknown keys are dropped.
fn project(event: &mut ParsedEvent, key: &str, value: &str) {
    let slot = match key {
        "level" => &mut event.severity,
        "process" => &mut event.process,
        "p:processName" => &mut event.process_name,
        "OSThread" => &mut event.os_thread,
        "t:clientID" => &mut event.client_id,
        "t:applicationName" => &mut event.application,
        "t:computerName" => &mut event.computer_name,
        "t:connectID" => &mut event.connect_id,
        "SessionID" => &mut event.session_id,
        "Usr" => &mut event.user,
        "DBMS" => &mut event.dbms,
        "DataBase" => &mut event.database,
        "Sql" => &mut event.sql_text,
        "Result" => &mut event.result,
        "Context" => &mut event.context,
        "elastic.trace.id" => &mut event.trace_id,
        "elastic.transaction.id" => &mut event.transaction_id,
        "elastic.span.id" => &mut event.span_id,
        _ => return,
    };
    *slot = Some(value.to_string());
}
