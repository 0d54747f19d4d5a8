//! Error types for the techlog pipeline.
//!
//! [`TechLogError`] covers the failures that abort processing of a file.
//! Per-entry problems are not errors: the decoder reports them as a
//! [`SkipReason`] and the pipeline moves on to the next entry.

use thiserror::Error;

/// Errors that abort processing of a log file.
#[derive(Debug, Error)]
pub enum TechLogError {
    /// The file name does not start with a `YYMMDDHH` date prefix.
    #[error("cannot extract date from file name {name:?}: {reason}")]
    InvalidFileName {
        /// The offending file name.
        name: String,
        /// Why the prefix was rejected.
        reason: &'static str,
    },

    /// An I/O error occurred while reading input or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization of a document or trace record failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A collaborator (document store or trace backend) failed.
    #[error("{sink} transport error: {message}")]
    Transport {
        /// Which collaborator failed.
        sink: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// A transaction already holds the maximum number of spans.
    #[error("span limit exceeded: transaction already holds {max} spans")]
    SpanLimitExceeded {
        /// The configured maximum.
        max: usize,
    },

    /// A trace operation required an active transaction but none was open.
    #[error("no active transaction")]
    NoActiveTransaction,

    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TechLogError {
    /// Creates a transport error for the given collaborator.
    pub fn transport(sink: &'static str, message: impl Into<String>) -> Self {
        Self::Transport {
            sink,
            message: message.into(),
        }
    }
}

/// Result type alias for techlog operations.
pub type Result<T> = std::result::Result<T, TechLogError>;

/// Why a logical entry was dropped without producing an event.
///
/// These are never fatal; the caller logs them at warning level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// The entry does not match the `MM:SS.micro-duration,event,level,rest` grammar.
    #[error("entry does not match the techlog grammar")]
    NoMatch,

    /// Minute or second is outside the valid range for the file's hour.
    #[error("invalid time of day {minute}:{second}.{micros}")]
    InvalidTimestamp {
        /// Minute component as logged.
        minute: u32,
        /// Second component as logged.
        second: u32,
        /// Microsecond component as logged.
        micros: u32,
    },

    /// The duration is not an unsigned integer that fits `u64`.
    #[error("invalid duration {0:?}")]
    InvalidDuration(String),

    /// `RowsAffected` is present but is not an integer.
    #[error("invalid RowsAffected value {0:?}")]
    InvalidRowsAffected(String),
}

impl SkipReason {
    /// Returns true for grammar-level skips, false for value validation skips.
    #[must_use]
    pub const fn is_decode_skip(&self) -> bool {
        matches!(self, Self::NoMatch | Self::InvalidTimestamp { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = TechLogError::InvalidFileName {
            name: "app.log".to_string(),
            reason: "prefix is not numeric",
        };
        assert_eq!(
            err.to_string(),
            "cannot extract date from file name \"app.log\": prefix is not numeric"
        );

        let err = TechLogError::transport("bulk store", "connection refused");
        assert_eq!(err.to_string(), "bulk store transport error: connection refused");

        let err = TechLogError::SpanLimitExceeded { max: 500 };
        assert_eq!(
            err.to_string(),
            "span limit exceeded: transaction already holds 500 spans"
        );

        let err = TechLogError::NoActiveTransaction;
        assert_eq!(err.to_string(), "no active transaction");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TechLogError>();
        assert_send_sync::<SkipReason>();
    }

    #[test]
    fn error_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TechLogError = io_err.into();
        assert!(matches!(err, TechLogError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn error_invalid_config() {
        let err = TechLogError::InvalidConfig("batch_size must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "invalid configuration: batch_size must be positive"
        );
    }

    #[test]
    fn skip_reason_classification() {
        assert!(SkipReason::NoMatch.is_decode_skip());
        assert!(
            SkipReason::InvalidTimestamp {
                minute: 61,
                second: 0,
                micros: 0
            }
            .is_decode_skip()
        );
        assert!(!SkipReason::InvalidDuration("99999999999999999999999".into()).is_decode_skip());
        assert!(!SkipReason::InvalidRowsAffected("many".into()).is_decode_skip());
    }

    #[test]
    fn skip_reason_display() {
        let reason = SkipReason::InvalidTimestamp {
            minute: 75,
            second: 3,
            micros: 12,
        };
        assert_eq!(reason.to_string(), "invalid time of day 75:3.12");
        assert_eq!(
            SkipReason::InvalidRowsAffected("x".into()).to_string(),
            "invalid RowsAffected value \"x\""
        );
    }
}
