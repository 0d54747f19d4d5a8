//! Transaction and span records handed to trace backends.
//!
//! A backend owns at most one open [`Transaction`] at a time. The trace
//! adapter reaches it through `TraceBackend::current_transaction`, opens spans
//! on it, and the backend takes it back when the transaction ends.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TechLogError};

/// Default span budget per transaction.
pub const DEFAULT_MAX_SPANS: usize = 500;

/// Outcome of a span that completed normally.
pub const OUTCOME_SUCCESS: &str = "success";

/// Outcome of a span cut short by an error.
pub const OUTCOME_FAILURE: &str = "failure";

/// Generates a 128-bit trace identifier as 32 lowercase hex digits.
#[must_use]
pub fn new_trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Generates a 64-bit transaction or span identifier as 16 lowercase hex digits.
#[must_use]
pub fn new_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

/// User attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    /// Login name.
    pub username: String,
    /// Stable identifier; techlog only knows the login, so it doubles as the id.
    pub id: String,
}

/// Database details attached to a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbContext {
    /// Database instance (the logging process).
    pub instance: Option<String>,
    /// Database technology.
    #[serde(rename = "type")]
    pub db_type: String,
    /// Database user.
    pub user: Option<String>,
}

/// Context attached to a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanContext {
    /// Database details.
    pub db: DbContext,
}

/// A timed operation nested in a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Span identifier.
    pub id: String,
    /// Identifier of the owning transaction.
    pub transaction_id: String,
    /// Span name.
    pub name: String,
    /// Span type, e.g. `app` or `db`.
    #[serde(rename = "type")]
    pub span_type: String,
    /// Start relative to the transaction start, in milliseconds.
    pub start_offset_ms: f64,
    /// Duration in milliseconds, set when the span ends.
    pub duration_ms: Option<f64>,
    /// Searchable labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Optional structured context.
    pub context: Option<SpanContext>,
    /// `success` or `failure`, once known.
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    ended: bool,
}

impl Span {
    /// Sets a label, replacing any previous value.
    pub fn set_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(key.into(), value.into());
    }

    /// Sets the outcome, replacing any previous value.
    pub fn set_outcome(&mut self, outcome: &str) {
        self.outcome = Some(outcome.to_string());
    }

    /// Ends the span with the given duration. Ending twice keeps the first duration.
    pub fn end(&mut self, duration_ms: f64) {
        if !self.ended {
            self.duration_ms = Some(duration_ms);
            self.ended = true;
        }
    }

    /// Returns true once [`Span::end`] has been called.
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.ended
    }
}

/// A top-level traced operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction identifier.
    pub id: String,
    /// Trace this transaction belongs to.
    pub trace_id: String,
    /// Parent span or transaction in an external trace, if any.
    pub parent_id: Option<String>,
    /// Transaction type, e.g. `1c-log`.
    #[serde(rename = "type")]
    pub transaction_type: String,
    /// Name, set when the transaction ends.
    pub name: Option<String>,
    /// Outcome, set when the transaction ends or fails.
    pub result: Option<String>,
    /// Absolute start time.
    pub start: DateTime<Utc>,
    /// Duration in milliseconds, set when the transaction ends.
    pub duration_ms: Option<f64>,
    /// User context.
    pub user: Option<UserContext>,
    /// Spans opened on this transaction, in creation order.
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(skip)]
    max_spans: usize,
}

impl Transaction {
    /// Opens a transaction in a fresh trace.
    #[must_use]
    pub fn new(transaction_type: impl Into<String>, start: DateTime<Utc>, max_spans: usize) -> Self {
        Self {
            id: new_id(),
            trace_id: new_trace_id(),
            parent_id: None,
            transaction_type: transaction_type.into(),
            name: None,
            result: None,
            start,
            duration_ms: None,
            user: None,
            spans: Vec::new(),
            max_spans,
        }
    }

    /// Moves the transaction into an existing trace under the given parent.
    pub fn join_trace(&mut self, trace_id: impl Into<String>, parent_id: Option<String>) {
        self.trace_id = trace_id.into();
        self.parent_id = parent_id;
    }

    /// Attaches a user.
    pub fn set_user(&mut self, user: &str) {
        self.user = Some(UserContext {
            username: user.to_string(),
            id: user.to_string(),
        });
    }

    /// Opens a span on this transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TechLogError::SpanLimitExceeded`] when the span budget is spent.
    pub fn begin_span(
        &mut self,
        name: impl Into<String>,
        span_type: impl Into<String>,
        start_offset_ms: f64,
    ) -> Result<&mut Span> {
        if self.spans.len() >= self.max_spans {
            return Err(TechLogError::SpanLimitExceeded {
                max: self.max_spans,
            });
        }

        self.spans.push(Span {
            id: new_id(),
            transaction_id: self.id.clone(),
            name: name.into(),
            span_type: span_type.into(),
            start_offset_ms,
            duration_ms: None,
            labels: BTreeMap::new(),
            context: None,
            outcome: None,
            ended: false,
        });
        self.spans.last_mut().ok_or(TechLogError::NoActiveTransaction)
    }

    /// Records the final name, result and duration.
    pub fn finish(&mut self, name: &str, result: &str, duration_ms: f64) {
        self.name = Some(name.to_string());
        self.result = Some(result.to_string());
        self.duration_ms = Some(duration_ms);
    }

    /// Marks the transaction as errored.
    ///
    /// Every span still open gets the `failure` outcome and is ended with
    /// `duration_ms`; spans that already ended keep their outcome.
    pub fn mark_failed(&mut self, result: &str, duration_ms: f64) {
        self.result = Some(result.to_string());
        for span in self.spans.iter_mut().filter(|span| !span.is_ended()) {
            span.set_outcome(OUTCOME_FAILURE);
            span.end(duration_ms);
        }
    }

    /// Returns the span budget.
    #[must_use]
    pub const fn max_spans(&self) -> usize {
        self.max_spans
    }
}

/// An error reported to a trace backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedError {
    /// Error identifier.
    pub id: String,
    /// When the error happened: the open transaction's start, or capture time.
    pub timestamp: DateTime<Utc>,
    /// Trace of the transaction the error belongs to.
    pub trace_id: Option<String>,
    /// Transaction the error belongs to.
    pub transaction_id: Option<String>,
    /// Error message.
    pub message: String,
}

impl CapturedError {
    /// Builds a record for `error`, linked to `transaction` when given.
    #[must_use]
    pub fn new(error: &TechLogError, transaction: Option<&Transaction>) -> Self {
        Self {
            id: new_trace_id(),
            timestamp: transaction.map_or_else(Utc::now, |tx| tx.start),
            trace_id: transaction.map(|tx| tx.trace_id.clone()),
            transaction_id: transaction.map(|tx| tx.id.clone()),
            message: error.to_string(),
        }
    }
}

/// Holds the single open transaction of a backend.
#[derive(Debug)]
pub struct ActiveTransaction {
    max_spans: usize,
    current: Option<Transaction>,
}

impl ActiveTransaction {
    /// Creates an empty slot whose transactions allow `max_spans` spans.
    #[must_use]
    pub const fn new(max_spans: usize) -> Self {
        Self {
            max_spans,
            current: None,
        }
    }

    /// Opens a transaction, returning any transaction left open before it.
    pub fn begin(&mut self, transaction_type: &str, start: DateTime<Utc>) -> Option<Transaction> {
        self.current
            .replace(Transaction::new(transaction_type, start, self.max_spans))
    }

    /// Returns the open transaction.
    pub fn current(&mut self) -> Option<&mut Transaction> {
        self.current.as_mut()
    }

    /// Returns the open transaction without mutable access.
    #[must_use]
    pub const fn peek(&self) -> Option<&Transaction> {
        self.current.as_ref()
    }

    /// Closes the open transaction and hands it back.
    ///
    /// # Errors
    ///
    /// Returns [`TechLogError::NoActiveTransaction`] if nothing is open.
    pub fn end(&mut self, name: &str, result: &str, duration_ms: f64) -> Result<Transaction> {
        let mut transaction = self.current.take().ok_or(TechLogError::NoActiveTransaction)?;
        transaction.finish(name, result, duration_ms);
        Ok(transaction)
    }
}
