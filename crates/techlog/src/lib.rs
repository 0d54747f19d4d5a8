//! # techlog
//!
//! Parser and sink adapters for 1C:Enterprise technology logs.
//!
//! This crate provides:
//!
//! - [`DateContext`]: the hour a `YYMMDDHH.log` file covers
//! - [`EntryReassembler`]: groups physical lines into logical entries
//! - [`EntryDecoder`]: decodes an entry into a [`ParsedEvent`]
//! - [`EventKind`] / [`transaction_name`]: semantic naming of events
//! - [`SearchAdapter`]: batches events into a [`BulkDocumentStore`]
//! - [`TraceAdapter`]: records events as transactions on a [`TraceBackend`]
//! - [`ingest_file`]: runs one file through any [`EventSink`]
//! - [`TechLogConfig`]: TOML configuration
//!
//! ## Example
//!
//! ```rust
//! use techlog::{DateContext, EntryDecoder, EntryReassembler, transaction_name};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let context = DateContext::from_file_name("25060510.log")?;
//! let decoder = EntryDecoder::new(context);
//!
//! let text = "10:15.123456-5000,DBPOSTGRS,3,process=rphost,Sql=\"SELECT 1\"";
//! for entry in EntryReassembler::from_text(text) {
//!     let event = decoder.decode(&entry?)?;
//!     assert_eq!(transaction_name(&event), "DB:SELECT");
//!     assert_eq!(event.duration_us, 5000);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classifier;
pub mod collector;
pub mod config;
pub mod decoder;
pub mod error;
pub mod file_store;
pub mod filename;
pub mod reassembler;
pub mod search;
pub mod store;
pub mod tokenizer;
pub mod trace;
pub mod traits;
pub mod transaction;
pub mod types;

// Re-export main types
pub use classifier::{EventKind, transaction_name};
pub use collector::{IngestStats, ReaderOptions, ingest_file, ingest_reader};
pub use config::{SearchConfig, TechLogConfig, TraceConfig};
pub use decoder::EntryDecoder;
pub use error::{Result, SkipReason, TechLogError};
pub use file_store::{BulkFileStore, IntakeFileBackend, create_output};
pub use filename::DateContext;
pub use reassembler::EntryReassembler;
pub use search::{BulkOperation, SearchAdapter, SearchDocument, index_schema};
pub use store::{MemoryDocumentStore, MemoryTraceBackend, TraceRecording};
pub use trace::{TraceAdapter, TraceOptions};
pub use traits::{BulkDocumentStore, EventSink, TraceBackend};
pub use transaction::{CapturedError, Span, Transaction};
pub use types::{ParsedEvent, Parameters};
