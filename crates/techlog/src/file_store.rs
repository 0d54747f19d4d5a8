//! File-backed collaborators writing newline-delimited JSON.
//!
//! This module provides:
//! - [`BulkFileStore`]: writes bulk requests in the search `_bulk` body format
//! - [`IntakeFileBackend`]: writes transactions, spans and errors as trace intake events
//!
//! Both write to any [`Write`], usually a buffered file. The output can be
//! replayed against a live search cluster or trace server with a plain
//! HTTP client.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{Result, TechLogError};
use crate::search::BulkOperation;
use crate::traits::{BulkDocumentStore, TraceBackend};
use crate::transaction::{ActiveTransaction, CapturedError, Transaction};

/// Agent name reported in trace metadata.
pub const AGENT_NAME: &str = "techlog";

/// Creates `path` and wraps it in a buffered writer.
///
/// # Errors
///
/// Returns an error if the file cannot be created.
pub fn create_output(path: &Path) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

fn write_line<W: Write>(writer: &mut W, value: &impl serde::Serialize) -> Result<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Document store writing `_bulk` request bodies.
///
/// Each operation becomes an action line followed by a document line.
pub struct BulkFileStore<W: Write> {
    writer: W,
    indices: BTreeSet<String>,
    requests: usize,
}

impl<W: Write> BulkFileStore<W> {
    /// Wraps a writer.
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            indices: BTreeSet::new(),
            requests: 0,
        }
    }

    /// Returns the number of bulk requests written.
    #[must_use]
    pub const fn requests(&self) -> usize {
        self.requests
    }

    /// Flushes and returns the writer.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> BulkDocumentStore for BulkFileStore<W> {
    fn ensure_index(&mut self, name: &str, _schema: &Value) -> Result<()> {
        if self.indices.insert(name.to_string()) {
            info!(index = %name, "writing bulk requests to file");
        }
        Ok(())
    }

    fn bulk_index(&mut self, operations: &[BulkOperation]) -> Result<()> {
        for op in operations {
            if !self.indices.contains(&op.index) {
                return Err(TechLogError::transport(
                    "bulk file",
                    format!("index {} was never created", op.index),
                ));
            }
            write_line(&mut self.writer, &op.action())?;
            write_line(&mut self.writer, &op.document)?;
        }
        self.writer.flush()?;
        self.requests += 1;
        debug!(documents = operations.len(), "bulk request written");
        Ok(())
    }
}

fn epoch_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

fn offset(start: DateTime<Utc>, offset_ms: f64) -> DateTime<Utc> {
    start + Duration::microseconds((offset_ms * 1000.0) as i64)
}

fn transaction_event(tx: &Transaction) -> Value {
    let mut body = json!({
        "id": tx.id,
        "trace_id": tx.trace_id,
        "type": tx.transaction_type,
        "name": tx.name,
        "result": tx.result,
        "timestamp": epoch_micros(tx.start),
        "duration": tx.duration_ms,
        "span_count": { "started": tx.spans.len(), "dropped": 0 },
        "sampled": true,
    });
    if let Some(parent) = &tx.parent_id {
        body["parent_id"] = json!(parent);
    }
    if let Some(user) = &tx.user {
        body["context"] = json!({ "user": user });
    }
    json!({ "transaction": body })
}

fn span_events(tx: &Transaction) -> impl Iterator<Item = Value> + '_ {
    tx.spans.iter().map(move |span| {
        let mut body = json!({
            "id": span.id,
            "transaction_id": span.transaction_id,
            "parent_id": tx.id,
            "trace_id": tx.trace_id,
            "name": span.name,
            "type": span.span_type,
            "timestamp": epoch_micros(offset(tx.start, span.start_offset_ms)),
            "duration": span.duration_ms,
        });
        if let Some(outcome) = &span.outcome {
            body["outcome"] = json!(outcome);
        }
        let mut context = json!({ "tags": span.labels });
        if let Some(extra) = &span.context {
            context["db"] = json!(extra.db);
        }
        body["context"] = context;
        json!({ "span": body })
    })
}

fn error_event(err: &CapturedError) -> Value {
    let mut body = json!({
        "id": err.id,
        "timestamp": epoch_micros(err.timestamp),
        "exception": { "message": err.message, "type": "TechLogError" },
    });
    if let (Some(trace_id), Some(transaction_id)) = (&err.trace_id, &err.transaction_id) {
        body["trace_id"] = json!(trace_id);
        body["transaction_id"] = json!(transaction_id);
        body["parent_id"] = json!(transaction_id);
    }
    json!({ "error": body })
}

/// Trace backend writing intake events, one JSON object per line.
///
/// The first line carries service metadata. Every ended transaction is
/// written as its spans followed by the transaction itself.
pub struct IntakeFileBackend<W: Write> {
    writer: W,
    active: ActiveTransaction,
    transactions: usize,
    errors: usize,
    closed: bool,
}

impl<W: Write> IntakeFileBackend<W> {
    /// Wraps a writer and writes the metadata line.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata line cannot be written.
    pub fn new(
        mut writer: W,
        service_name: &str,
        environment: &str,
        max_spans: usize,
    ) -> Result<Self> {
        let metadata = json!({
            "metadata": {
                "service": {
                    "name": service_name,
                    "environment": environment,
                    "agent": { "name": AGENT_NAME, "version": env!("CARGO_PKG_VERSION") },
                }
            }
        });
        write_line(&mut writer, &metadata)?;
        info!(service = %service_name, environment = %environment, "writing trace events to file");

        Ok(Self {
            writer,
            active: ActiveTransaction::new(max_spans),
            transactions: 0,
            errors: 0,
            closed: false,
        })
    }

    /// Returns the number of transactions written.
    #[must_use]
    pub const fn transactions(&self) -> usize {
        self.transactions
    }

    /// Returns the number of errors written.
    #[must_use]
    pub const fn errors(&self) -> usize {
        self.errors
    }

    /// Flushes and returns the writer.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(TechLogError::transport("trace file", "backend is closed"));
        }
        Ok(())
    }
}

impl<W: Write> TraceBackend for IntakeFileBackend<W> {
    fn begin_transaction(&mut self, transaction_type: &str, start: DateTime<Utc>) -> Result<()> {
        self.ensure_open()?;
        if let Some(abandoned) = self.active.begin(transaction_type, start) {
            tracing::warn!(transaction = %abandoned.id, "discarding transaction that was never ended");
        }
        Ok(())
    }

    fn current_transaction(&mut self) -> Option<&mut Transaction> {
        self.active.current()
    }

    fn end_transaction(&mut self, name: &str, result: &str, duration_ms: f64) -> Result<()> {
        let transaction = self.active.end(name, result, duration_ms)?;
        for span in span_events(&transaction) {
            write_line(&mut self.writer, &span)?;
        }
        write_line(&mut self.writer, &transaction_event(&transaction))?;
        self.transactions += 1;
        Ok(())
    }

    fn capture_exception(&mut self, error: &TechLogError) -> Result<()> {
        let captured = CapturedError::new(error, self.active.peek());
        write_line(&mut self.writer, &error_event(&captured))?;
        self.errors += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.writer.flush()?;
        debug!(transactions = self.transactions, errors = self.errors, "trace file closed");
        Ok(())
    }
}
