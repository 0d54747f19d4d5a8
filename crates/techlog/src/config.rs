//! Pipeline configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! [reader]
//! skip_leading_blank_lines = false
//!
//! [search]
//! index_name = "1c_tech_log"
//! batch_size = 2000
//!
//! [trace]
//! service_name = "1c-enterprise"
//! environment = "production"
//! max_spans = 500
//! utc_offset = "+03:00"
//! ```
//!
//! Every section and key is optional.

use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::collector::ReaderOptions;
use crate::error::{Result, TechLogError};
use crate::search::{DEFAULT_BATCH_SIZE, DEFAULT_INDEX_NAME};
use crate::trace::TraceOptions;
use crate::transaction::DEFAULT_MAX_SPANS;

/// Settings for the search sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchConfig {
    /// Target index.
    pub index_name: String,
    /// Documents per bulk request.
    pub batch_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_name: DEFAULT_INDEX_NAME.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Settings for the trace sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TraceConfig {
    /// Service the transactions are reported under.
    pub service_name: String,
    /// Deployment environment.
    pub environment: String,
    /// Span budget per transaction.
    pub max_spans: usize,
    /// Offset of the server clock, `+HH:MM` or `-HH:MM`.
    pub utc_offset: String,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            service_name: "1c-enterprise".to_string(),
            environment: "production".to_string(),
            max_spans: DEFAULT_MAX_SPANS,
            utc_offset: "+00:00".to_string(),
        }
    }
}

/// Full configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TechLogConfig {
    /// Reader settings.
    #[serde(default)]
    pub reader: ReaderOptions,
    /// Search sink settings.
    #[serde(default)]
    pub search: SearchConfig,
    /// Trace sink settings.
    #[serde(default)]
    pub trace: TraceConfig,
}

impl TechLogConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TechLogError::InvalidConfig(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| TechLogError::InvalidConfig(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is unusable.
    pub fn validate(&self) -> Result<()> {
        if self.search.index_name.trim().is_empty() {
            return Err(TechLogError::InvalidConfig(
                "search.index_name cannot be empty".to_string(),
            ));
        }

        if self.search.batch_size == 0 {
            return Err(TechLogError::InvalidConfig(
                "search.batch_size must be greater than 0".to_string(),
            ));
        }

        if self.trace.service_name.trim().is_empty() {
            return Err(TechLogError::InvalidConfig(
                "trace.service_name cannot be empty".to_string(),
            ));
        }

        if self.trace.max_spans == 0 {
            return Err(TechLogError::InvalidConfig(
                "trace.max_spans must be greater than 0".to_string(),
            ));
        }

        self.trace_options().map(|_| ())
    }

    /// Builds the trace adapter options.
    ///
    /// # Errors
    ///
    /// Returns an error if `trace.utc_offset` cannot be parsed.
    pub fn trace_options(&self) -> Result<TraceOptions> {
        let utc_offset = parse_utc_offset(&self.trace.utc_offset).ok_or_else(|| {
            TechLogError::InvalidConfig(format!(
                "trace.utc_offset {:?} is not of the form +HH:MM",
                self.trace.utc_offset
            ))
        })?;
        Ok(TraceOptions { utc_offset })
    }
}

/// Parses `Z`, `+HH`, `+HHMM` or `+HH:MM` (and the `-` forms).
#[must_use]
pub fn parse_utc_offset(text: &str) -> Option<FixedOffset> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let (sign, digits) = match text.split_at_checked(1)? {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => return None,
    };
    let digits: String = match digits.len() {
        2 | 4 => digits.to_string(),
        5 if digits.as_bytes()[2] == b':' => digits.replace(':', ""),
        _ => return None,
    };
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits.get(..2)?.parse().ok()?;
    let minutes: i32 = digits.get(2..).filter(|m| !m.is_empty()).map_or(Some(0), |m| m.parse().ok())?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
