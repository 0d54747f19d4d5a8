//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`search`] - Index a file into the search store
//! - [`trace`] - Record a file as trace transactions
//! - [`parse`] - Print decoded events

pub mod parse;
pub mod search;
pub mod trace;

pub use parse::ParseCommand;
pub use search::SearchCommand;
pub use trace::TraceCommand;

use std::io::Write;
use std::path::Path;

use techlog::{TechLogConfig, create_output};

use crate::error::CliError;
use crate::output::Destination;

/// Loads the configuration file, or the defaults when none is given.
///
/// # Errors
///
/// Returns [`CliError::Config`] if the file cannot be read or is invalid.
pub fn load_config(path: Option<&Path>) -> Result<TechLogConfig, CliError> {
    match path {
        Some(path) => {
            TechLogConfig::from_file(path).map_err(|e| CliError::Config(e.to_string()))
        }
        None => Ok(TechLogConfig::default()),
    }
}

/// Opens the data sink: the `--output` file when given, `out` otherwise.
fn open_sink<'a, W: Write>(
    output: Option<&Path>,
    out: &'a mut W,
) -> Result<(Box<dyn Write + 'a>, Destination), CliError> {
    match output {
        Some(path) => Ok((Box::new(create_output(path)?), Destination::File)),
        None => Ok((Box::new(out), Destination::Stdout)),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
