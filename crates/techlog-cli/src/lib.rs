//! # techlog-cli
//!
//! Command-line shipper for 1C:Enterprise technology logs.
//!
//! Provides commands for:
//! - Indexing a file into a search store (`search`)
//! - Recording a file as trace transactions (`trace`)
//! - Inspecting decoded events (`parse`)
//!
//! Data is written as newline-delimited JSON, to a file or to stdout, in the
//! format the target backend ingests. Diagnostics go to stderr.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format, LogFormat, ParseArgs, SearchArgs, TraceArgs};
pub use error::CliError;
pub use output::{OutputFormat, RunSummary};
