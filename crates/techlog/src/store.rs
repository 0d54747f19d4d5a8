//! In-memory collaborators.
//!
//! This module provides:
//! - [`MemoryDocumentStore`]: a [`BulkDocumentStore`] keeping documents in memory
//! - [`MemoryTraceBackend`]: a [`TraceBackend`] keeping finished transactions
//! - [`TraceRecording`]: a read handle on what a memory backend received
//!
//! Both are used for dry runs and tests. Clones of a store and recordings of
//! a backend share state, so a caller can keep a handle while the adapter
//! owns the collaborator.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::{Result, TechLogError};
use crate::search::BulkOperation;
use crate::traits::{BulkDocumentStore, TraceBackend};
use crate::transaction::{ActiveTransaction, CapturedError, Transaction};

#[derive(Debug, Default)]
struct IndexState {
    schemas: BTreeMap<String, serde_json::Value>,
    operations: Vec<BulkOperation>,
    requests: usize,
}

/// Document store backed by memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<RwLock<IndexState>>,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the index has been created.
    #[must_use]
    pub fn has_index(&self, name: &str) -> bool {
        self.state.read().schemas.contains_key(name)
    }

    /// Returns the mapping the index was created with.
    #[must_use]
    pub fn schema(&self, name: &str) -> Option<serde_json::Value> {
        self.state.read().schemas.get(name).cloned()
    }

    /// Returns every indexed operation, in submission order.
    #[must_use]
    pub fn operations(&self) -> Vec<BulkOperation> {
        self.state.read().operations.clone()
    }

    /// Returns the number of bulk requests received.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.state.read().requests
    }

    /// Returns the number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().operations.len()
    }

    /// Returns true if nothing has been indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().operations.is_empty()
    }
}

impl BulkDocumentStore for MemoryDocumentStore {
    fn ensure_index(&mut self, name: &str, schema: &serde_json::Value) -> Result<()> {
        self.state
            .write()
            .schemas
            .entry(name.to_string())
            .or_insert_with(|| schema.clone());
        Ok(())
    }

    fn bulk_index(&mut self, operations: &[BulkOperation]) -> Result<()> {
        let mut state = self.state.write();
        if let Some(missing) = operations
            .iter()
            .find(|op| !state.schemas.contains_key(&op.index))
        {
            return Err(TechLogError::transport(
                "memory store",
                format!("index {} does not exist", missing.index),
            ));
        }
        state.operations.extend_from_slice(operations);
        state.requests += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct TraceState {
    transactions: Vec<Transaction>,
    errors: Vec<CapturedError>,
    closed: bool,
}

/// Read handle on the data a [`MemoryTraceBackend`] received.
#[derive(Debug, Clone, Default)]
pub struct TraceRecording {
    state: Arc<RwLock<TraceState>>,
}

impl TraceRecording {
    /// Returns finished transactions, in completion order.
    #[must_use]
    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.read().transactions.clone()
    }

    /// Returns captured errors.
    #[must_use]
    pub fn errors(&self) -> Vec<CapturedError> {
        self.state.read().errors.clone()
    }

    /// Returns true once the backend has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }
}

/// Trace backend backed by memory.
#[derive(Debug)]
pub struct MemoryTraceBackend {
    active: ActiveTransaction,
    recording: TraceRecording,
}

impl MemoryTraceBackend {
    /// Creates a backend whose transactions allow `max_spans` spans.
    #[must_use]
    pub fn new(max_spans: usize) -> Self {
        Self {
            active: ActiveTransaction::new(max_spans),
            recording: TraceRecording::default(),
        }
    }

    /// Returns a handle sharing this backend's recorded data.
    #[must_use]
    pub fn recording(&self) -> TraceRecording {
        self.recording.clone()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.recording.is_closed() {
            return Err(TechLogError::transport("memory trace backend", "backend is closed"));
        }
        Ok(())
    }
}

impl TraceBackend for MemoryTraceBackend {
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
        self.recording.state.write().transactions.push(transaction);
        Ok(())
    }

    fn capture_exception(&mut self, error: &TechLogError) -> Result<()> {
        let captured = CapturedError::new(error, self.active.peek());
        self.recording.state.write().errors.push(captured);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.recording.state.write().closed = true;
        Ok(())
    }
}
