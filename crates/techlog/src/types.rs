//! Core event types.
//!
//! This module provides:
//! - [`ParsedEvent`]: one decoded techlog entry
//! - [`Parameters`]: the decoded `Prm` property map

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Decoded `Prm` properties, keyed by property name.
pub type Parameters = BTreeMap<String, String>;

/// A decoded techlog entry.
///
/// Only the properties listed here survive decoding; anything else in the
/// source line is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedEvent {
    /// Wall-clock time of the entry, as written by the server.
    pub timestamp: NaiveDateTime,
    /// Duration in microseconds, as logged.
    pub duration_us: u64,
    /// Event code, e.g. `DBPOSTGRS` or `SCALL`.
    pub event_name: String,
    /// Numeric token after the event code, kept as text.
    pub level: String,
    /// `level=` property.
    pub severity: Option<String>,
    /// `process` property.
    pub process: Option<String>,
    /// `p:processName` property.
    pub process_name: Option<String>,
    /// `OSThread` property.
    pub os_thread: Option<String>,
    /// `t:clientID` property.
    pub client_id: Option<String>,
    /// `t:applicationName` property.
    pub application: Option<String>,
    /// `t:computerName` property.
    pub computer_name: Option<String>,
    /// `t:connectID` property.
    pub connect_id: Option<String>,
    /// `SessionID` property.
    pub session_id: Option<String>,
    /// `Usr` property.
    pub user: Option<String>,
    /// `DBMS` property.
    pub dbms: Option<String>,
    /// `DataBase` property.
    pub database: Option<String>,
    /// `Sql` property.
    pub sql_text: Option<String>,
    /// `RowsAffected` property. `None` means the server did not report it.
    pub rows_affected: Option<i64>,
    /// `Result` property.
    pub result: Option<String>,
    /// `Context` property.
    pub context: Option<String>,
    /// `elastic.trace.id` correlation property.
    pub trace_id: Option<String>,
    /// `elastic.transaction.id` correlation property.
    pub transaction_id: Option<String>,
    /// `elastic.span.id` correlation property.
    pub span_id: Option<String>,
    /// Decoded `Prm` property; empty when absent.
    #[serde(default)]
    pub parameters: Parameters,
}

impl ParsedEvent {
    /// Creates an event with the fixed-prefix fields set and every property absent.
    #[must_use]
    pub fn new(
        timestamp: NaiveDateTime,
        duration_us: u64,
        event_name: impl Into<String>,
        level: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            duration_us,
            event_name: event_name.into(),
            level: level.into(),
            severity: None,
            process: None,
            process_name: None,
            os_thread: None,
            client_id: None,
            application: None,
            computer_name: None,
            connect_id: None,
            session_id: None,
            user: None,
            dbms: None,
            database: None,
            sql_text: None,
            rows_affected: None,
            result: None,
            context: None,
            trace_id: None,
            transaction_id: None,
            span_id: None,
            parameters: Parameters::new(),
        }
    }

    /// Duration in milliseconds, unclamped.
    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        self.duration_us as f64 / 1000.0
    }

    /// Returns true if the line carried any correlation identifier.
    #[must_use]
    pub const fn has_correlation(&self) -> bool {
        self.trace_id.is_some() || self.transaction_id.is_some() || self.span_id.is_some()
    }
}
