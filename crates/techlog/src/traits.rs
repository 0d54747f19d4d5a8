//! Traits for the collaborators the pipeline talks to.
//!
//! This module provides:
//! - [`BulkDocumentStore`]: a search store accepting batched documents
//! - [`TraceBackend`]: a distributed-tracing client
//! - [`EventSink`]: anything that consumes decoded events
//!
//! Network clients live outside this crate; they only need to implement
//! these traits. The crate ships in-memory and file-backed implementations.

use chrono::{DateTime, Utc};

use crate::error::{Result, TechLogError};
use crate::search::BulkOperation;
use crate::transaction::Transaction;
use crate::types::ParsedEvent;

/// A search store that accepts documents in bulk.
pub trait BulkDocumentStore {
    /// Creates the index with the given mapping unless it already exists.
    ///
    /// Must be idempotent.
    fn ensure_index(&mut self, name: &str, schema: &serde_json::Value) -> Result<()>;

    /// Indexes a batch of documents.
    ///
    /// There is no partial-failure contract: either the whole batch is
    /// accepted or an error is returned.
    fn bulk_index(&mut self, operations: &[BulkOperation]) -> Result<()>;
}

/// A distributed-tracing client holding at most one open transaction.
pub trait TraceBackend {
    /// Opens a transaction starting at `start`.
    fn begin_transaction(&mut self, transaction_type: &str, start: DateTime<Utc>) -> Result<()>;

    /// Returns the open transaction, if any.
    fn current_transaction(&mut self) -> Option<&mut Transaction>;

    /// Names and closes the open transaction and queues it for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`TechLogError::NoActiveTransaction`] if nothing is open.
    fn end_transaction(&mut self, name: &str, result: &str, duration_ms: f64) -> Result<()>;

    /// Reports an error, linked to the open transaction when there is one.
    fn capture_exception(&mut self, error: &TechLogError) -> Result<()>;

    /// Flushes everything queued. Called once at shutdown.
    fn close(&mut self) -> Result<()>;
}

/// A consumer of decoded events.
pub trait EventSink {
    /// Handles one event.
    fn accept(&mut self, event: &ParsedEvent) -> Result<()>;

    /// Called once after the last event of the input.
    fn finish(&mut self) -> Result<()>;
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn accept(&mut self, event: &ParsedEvent) -> Result<()> {
        (**self).accept(event)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn accept(&mut self, event: &ParsedEvent) -> Result<()> {
        (**self).accept(event)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}
