//! Trace sink.
//!
//! Every event becomes one transaction of type `1c-log` holding a single
//! `process_event` span. The transaction starts at the event timestamp and
//! lasts as long as the logged duration, so a trace UI shows server activity
//! on the same timeline as live application traces.

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{error, warn};

use crate::classifier::transaction_name;
use crate::error::{Result, TechLogError};
use crate::traits::{EventSink, TraceBackend};
use crate::transaction::{DbContext, OUTCOME_SUCCESS, SpanContext};
use crate::types::ParsedEvent;

/// Transaction type of every techlog transaction.
pub const TRANSACTION_TYPE: &str = "1c-log";

/// Name of the span nested in each transaction.
pub const SPAN_NAME: &str = "process_event";

/// Type of the span nested in each transaction.
pub const SPAN_TYPE: &str = "app";

/// Database type reported in span context.
pub const DB_TYPE: &str = "1c-enterprise";

/// Smallest duration handed to the backend, in milliseconds.
pub const MIN_DURATION_MS: f64 = 1.0;

/// Result of a transaction built without errors.
pub const RESULT_SUCCESS: &str = "success";

/// Result of a transaction whose span could not be built.
pub const RESULT_ERROR: &str = "error";

/// Clamps a duration to a usable positive number of milliseconds.
///
/// Trace backends reject or mis-render zero and negative durations.
#[must_use]
pub fn clamp_duration_ms(duration_ms: f64) -> f64 {
    if duration_ms.is_finite() && duration_ms > 0.0 {
        duration_ms
    } else {
        MIN_DURATION_MS
    }
}

/// Options for [`TraceAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceOptions {
    /// Offset of the server clock that wrote the log.
    pub utc_offset: FixedOffset,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            utc_offset: FixedOffset::east_opt(0).unwrap_or_else(|| unreachable!()),
        }
    }
}

/// Turns events into transactions on a [`TraceBackend`].
///
/// The adapter owns the backend. [`TraceAdapter::close`] flushes it; if the
/// adapter is dropped without being closed (an early return on error, for
/// instance) the backend is closed on drop.
pub struct TraceAdapter<B: TraceBackend> {
    backend: B,
    options: TraceOptions,
    transactions: usize,
    closed: bool,
}

impl<B: TraceBackend> TraceAdapter<B> {
    /// Creates an adapter around an open backend.
    pub const fn new(backend: B, options: TraceOptions) -> Self {
        Self {
            backend,
            options,
            transactions: 0,
            closed: false,
        }
    }

    /// Records one event as a transaction with a single span.
    ///
    /// # Errors
    ///
    /// Backend failures are returned as-is. A failure while building the
    /// span is reported through [`TraceBackend::capture_exception`] and the
    /// transaction is ended with result `error`; that build failure is what
    /// gets returned, even when ending the transaction fails too.
    pub fn record(&mut self, event: &ParsedEvent) -> Result<()> {
        let raw_ms = event.duration_ms();
        let duration_ms = clamp_duration_ms(raw_ms);
        if raw_ms <= 0.0 {
            warn!(
                event = %event.event_name,
                timestamp = %event.timestamp,
                duration_ms = raw_ms,
                "non-positive duration, clamped to minimum"
            );
        }

        let name = transaction_name(event);
        self.backend
            .begin_transaction(TRANSACTION_TYPE, self.start_time(event))?;

        if let Err(err) = self.build(event, duration_ms) {
            if let Some(transaction) = self.backend.current_transaction() {
                transaction.mark_failed(RESULT_ERROR, duration_ms);
            }
            error!(transaction = %name, error = %err, "failed to build transaction");
            if let Err(capture_err) = self.backend.capture_exception(&err) {
                error!(error = %capture_err, "failed to report error to trace backend");
            }
            if let Err(end_err) = self.backend.end_transaction(&name, RESULT_ERROR, duration_ms) {
                error!(transaction = %name, error = %end_err, "failed to end errored transaction");
            }
            return Err(err);
        }

        self.backend
            .end_transaction(&name, RESULT_SUCCESS, duration_ms)?;
        self.transactions += 1;
        Ok(())
    }

    fn build(&mut self, event: &ParsedEvent, duration_ms: f64) -> Result<()> {
        let transaction = self
            .backend
            .current_transaction()
            .ok_or(TechLogError::NoActiveTransaction)?;

        if let Some(trace_id) = &event.trace_id {
            let parent = event.span_id.clone().or_else(|| event.transaction_id.clone());
            transaction.join_trace(trace_id.as_str(), parent);
        }
        if let Some(user) = &event.user {
            transaction.set_user(user);
        }

        let span = transaction.begin_span(SPAN_NAME, SPAN_TYPE, 0.0)?;
        span.set_label("event_type", event.event_name.as_str());
        span.set_label("severity", event.severity.as_deref().unwrap_or("info"));
        span.set_label("process", event.process.as_deref().unwrap_or_default());
        span.set_label("connect_id", event.connect_id.as_deref().unwrap_or_default());
        span.context = Some(SpanContext {
            db: DbContext {
                instance: event.process.clone(),
                db_type: DB_TYPE.to_string(),
                user: event.user.clone(),
            },
        });
        span.set_outcome(OUTCOME_SUCCESS);
        span.end(duration_ms);
        Ok(())
    }

    fn start_time(&self, event: &ParsedEvent) -> DateTime<Utc> {
        event
            .timestamp
            .and_local_timezone(self.options.utc_offset)
            .single()
            .map_or_else(|| event.timestamp.and_utc(), |local| local.with_timezone(&Utc))
    }

    /// Closes the backend, flushing queued data. Later calls do nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.backend.close()
    }

    /// Returns the number of transactions recorded successfully.
    #[must_use]
    pub const fn transactions(&self) -> usize {
        self.transactions
    }

    /// Borrows the backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: TraceBackend> EventSink for TraceAdapter<B> {
    fn accept(&mut self, event: &ParsedEvent) -> Result<()> {
        self.record(event)
    }

    fn finish(&mut self) -> Result<()> {
        self.close()
    }
}

impl<B: TraceBackend> Drop for TraceAdapter<B> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            error!(error = %err, "failed to close trace backend");
        }
    }
}
