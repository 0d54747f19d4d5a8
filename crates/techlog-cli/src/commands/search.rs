//! Search command implementation.
//!
//! Indexes one techlog file, writing `_bulk` request bodies or keeping the
//! documents in memory for a dry run.

use std::io::Write;

use tracing::info;

use techlog::{
    BulkFileStore, MemoryDocumentStore, SearchAdapter, TechLogConfig, ingest_file,
};

use crate::cli::SearchArgs;
use crate::error::CliError;
use crate::output::{Destination, RunSummary};

use super::{display_name, open_sink};

/// Handler for the search command.
pub struct SearchCommand<'a> {
    config: &'a TechLogConfig,
}

impl<'a> SearchCommand<'a> {
    /// Creates a new search command handler.
    #[must_use]
    pub const fn new(config: &'a TechLogConfig) -> Self {
        Self { config }
    }

    /// Executes the search command.
    ///
    /// Bulk bodies go to `--output` when given, to `out` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are invalid or the pipeline fails.
    pub fn execute<W: Write>(&self, out: &mut W, args: &SearchArgs) -> Result<RunSummary, CliError> {
        let mut search = self.config.search.clone();
        if let Some(index) = &args.index {
            search.index_name.clone_from(index);
        }
        if let Some(batch_size) = args.batch_size {
            search.batch_size = batch_size;
        }
        let config = TechLogConfig {
            search,
            ..self.config.clone()
        };
        config.validate()?;

        let index = config.search.index_name.as_str();
        let batch_size = config.search.batch_size;
        let reader = config.reader;

        let (stats, requests, destination) = if args.dry_run {
            let store = MemoryDocumentStore::new();
            let mut adapter = SearchAdapter::new(store.clone(), index, batch_size)?;
            let stats = ingest_file(&args.log, reader, &mut adapter)?;
            info!(documents = store.len(), "dry run, documents discarded");
            (stats, store.requests(), Destination::DryRun)
        } else {
            let (writer, destination) = open_sink(args.output.as_deref(), out)?;
            let mut adapter = SearchAdapter::new(BulkFileStore::new(writer), index, batch_size)?;
            let stats = ingest_file(&args.log, reader, &mut adapter)?;
            let requests = adapter.requests();
            adapter.into_store().into_inner()?;
            (stats, requests, destination)
        };

        Ok(RunSummary {
            command: "search",
            file: display_name(&args.log),
            entries: stats.entries,
            events: stats.events,
            skipped: stats.skipped(),
            delivered: stats.events,
            unit: "document(s)",
            requests: Some(requests),
            errors: None,
            destination,
        })
    }
}
