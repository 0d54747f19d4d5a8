//! Search-index sink.
//!
//! This module provides:
//! - [`SearchDocument`]: the flat document indexed per event
//! - [`index_schema`]: the index mapping
//! - [`BulkOperation`]: one action/document pair of a bulk request
//! - [`SearchAdapter`]: batches documents into a [`BulkDocumentStore`]

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{Result, TechLogError};
use crate::traits::{BulkDocumentStore, EventSink};
use crate::types::{Parameters, ParsedEvent};

/// Documents per bulk request.
pub const DEFAULT_BATCH_SIZE: usize = 2000;

/// Default index name.
pub const DEFAULT_INDEX_NAME: &str = "1c_tech_log";

/// The document stored in the search index for one event.
///
/// Field names match the index mapping returned by [`index_schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    /// Event time.
    pub timestamp: NaiveDateTime,
    /// Duration in microseconds.
    pub duration: u64,
    /// Event code.
    pub event_name: String,
    /// Numeric level token from the entry prefix (the nesting depth).
    ///
    /// Indexes written by earlier shippers stored the `level=` property here;
    /// that value now lives in [`SearchDocument::severity`]. Queries and
    /// dashboards filtering on `level` must be moved to `severity`.
    pub level: String,
    /// `level=` property (`INFO`, `WARNING`, ...), formerly indexed as `level`.
    pub severity: Option<String>,
    /// Process.
    pub process: Option<String>,
    /// Process name.
    pub process_name: Option<String>,
    /// OS thread.
    pub os_thread: Option<String>,
    /// Client id.
    pub client_id: Option<String>,
    /// Application name.
    pub application: Option<String>,
    /// Computer name.
    pub computer_name: Option<String>,
    /// Connection id.
    pub connect_id: Option<String>,
    /// Session id.
    pub session_id: Option<String>,
    /// User.
    pub user: Option<String>,
    /// DBMS kind.
    pub dbms: Option<String>,
    /// Database.
    pub database: Option<String>,
    /// SQL text.
    pub sql_text: Option<String>,
    /// Decoded `Prm` properties.
    pub parameters: Parameters,
    /// Rows affected, when reported.
    pub rows_affected: Option<i64>,
    /// Result code.
    pub result: Option<String>,
    /// Free-form context.
    #[serde(rename = "Context")]
    pub context: Option<String>,
    /// Correlated trace.
    #[serde(rename = "trace.id", skip_serializing_if = "Option::is_none", default)]
    pub trace_id: Option<String>,
    /// Correlated transaction.
    #[serde(rename = "transaction.id", skip_serializing_if = "Option::is_none", default)]
    pub transaction_id: Option<String>,
    /// Correlated span.
    #[serde(rename = "span.id", skip_serializing_if = "Option::is_none", default)]
    pub span_id: Option<String>,
}

impl From<&ParsedEvent> for SearchDocument {
    fn from(event: &ParsedEvent) -> Self {
        Self {
            timestamp: event.timestamp,
            duration: event.duration_us,
            event_name: event.event_name.clone(),
            level: event.level.clone(),
            severity: event.severity.clone(),
            process: event.process.clone(),
            process_name: event.process_name.clone(),
            os_thread: event.os_thread.clone(),
            client_id: event.client_id.clone(),
            application: event.application.clone(),
            computer_name: event.computer_name.clone(),
            connect_id: event.connect_id.clone(),
            session_id: event.session_id.clone(),
            user: event.user.clone(),
            dbms: event.dbms.clone(),
            database: event.database.clone(),
            sql_text: event.sql_text.clone(),
            parameters: event.parameters.clone(),
            rows_affected: event.rows_affected,
            result: event.result.clone(),
            context: event.context.clone(),
            trace_id: event.trace_id.clone(),
            transaction_id: event.transaction_id.clone(),
            span_id: event.span_id.clone(),
        }
    }
}

/// Returns the index mapping for [`SearchDocument`].
#[must_use]
pub fn index_schema() -> serde_json::Value {
    json!({
        "mappings": {
            "properties": {
                "timestamp": {"type": "date"},
                "duration": {"type": "long"},
                "event_name": {"type": "keyword"},
                "level": {"type": "keyword"},
                "severity": {"type": "keyword"},
                "process": {"type": "keyword"},
                "process_name": {"type": "keyword"},
                "os_thread": {"type": "keyword"},
                "client_id": {"type": "keyword"},
                "application": {"type": "keyword"},
                "computer_name": {"type": "keyword"},
                "connect_id": {"type": "keyword"},
                "session_id": {"type": "keyword"},
                "user": {"type": "keyword"},
                "dbms": {"type": "keyword"},
                "database": {"type": "keyword"},
                "sql_text": {"type": "text"},
                "parameters": {"type": "flattened"},
                "rows_affected": {"type": "integer"},
                "result": {"type": "keyword"},
                "Context": {"type": "text"},
                "trace.id": {"type": "keyword"},
                "transaction.id": {"type": "keyword"},
                "span.id": {"type": "keyword"}
            }
        }
    })
}

/// One entry of a bulk request: an index action and its document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOperation {
    /// Target index.
    pub index: String,
    /// Document body.
    pub document: SearchDocument,
}

impl BulkOperation {
    /// Returns the action header, `{"index": {"_index": ...}}`.
    #[must_use]
    pub fn action(&self) -> serde_json::Value {
        json!({ "index": { "_index": self.index } })
    }
}

/// Batches events into bulk requests against a document store.
pub struct SearchAdapter<S> {
    store: S,
    index_name: String,
    batch_size: usize,
    batch: Vec<BulkOperation>,
    indexed: usize,
    requests: usize,
}

impl<S: BulkDocumentStore> SearchAdapter<S> {
    /// Creates the adapter and makes sure the index exists.
    ///
    /// # Errors
    ///
    /// Returns an error if `batch_size` is zero or the store cannot create the index.
    pub fn new(mut store: S, index_name: impl Into<String>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(TechLogError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }

        let index_name = index_name.into();
        store.ensure_index(&index_name, &index_schema())?;
        info!(index = %index_name, batch_size, "search index ready");

        Ok(Self {
            store,
            index_name,
            batch_size,
            batch: Vec::with_capacity(batch_size),
            indexed: 0,
            requests: 0,
        })
    }

    /// Queues one event, sending the batch once it is full.
    pub fn push(&mut self, event: &ParsedEvent) -> Result<()> {
        self.batch.push(BulkOperation {
            index: self.index_name.clone(),
            document: SearchDocument::from(event),
        });
        if self.batch.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Sends whatever is queued. Does nothing when the batch is empty.
    pub fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }

        self.store.bulk_index(&self.batch)?;
        self.indexed += self.batch.len();
        self.requests += 1;
        debug!(
            index = %self.index_name,
            documents = self.batch.len(),
            total = self.indexed,
            "bulk request sent"
        );
        self.batch.clear();
        Ok(())
    }

    /// Returns the number of queued, unsent documents.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Returns the number of documents sent so far.
    #[must_use]
    pub const fn indexed(&self) -> usize {
        self.indexed
    }

    /// Returns the number of bulk requests sent so far.
    #[must_use]
    pub const fn requests(&self) -> usize {
        self.requests
    }

    /// Returns the index name.
    #[must_use]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Borrows the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Consumes the adapter and returns the store. Unsent documents are discarded.
    pub fn into_store(self) -> S {
        self.store
    }
}

impl<S: BulkDocumentStore> EventSink for SearchAdapter<S> {
    fn accept(&mut self, event: &ParsedEvent) -> Result<()> {
        self.push(event)
    }

    fn finish(&mut self) -> Result<()> {
        self.flush()
    }
}
