//! Date context resolved from techlog file names.
//!
//! The platform writes one file per hour and names it `YYMMDDHH.log`.
//! Entries inside the file only carry `MM:SS.micro`, so the file name is the
//! anchor every timestamp is built from.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Result, TechLogError};

/// Length of the `YYMMDDHH` prefix.
const DATE_PREFIX_LEN: usize = 8;

/// The hour a techlog file covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateContext {
    date: NaiveDate,
    hour: u32,
}

impl DateContext {
    /// Builds a context from explicit components.
    ///
    /// Returns `None` when the components do not name a real calendar hour.
    #[must_use]
    pub fn new(year: i32, month: u32, day: u32, hour: u32) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        (hour < 24).then_some(Self { date, hour })
    }

    /// Resolves the context from a file name such as `25060510.log`.
    ///
    /// Directory components are ignored.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let base = Path::new(name)
            .file_name()
            .map_or_else(|| name.to_string(), |n| n.to_string_lossy().into_owned());
        Self::from_base_name(&base)
    }

    /// Resolves the context from a path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let base = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_base_name(&base)
    }

    fn from_base_name(base: &str) -> Result<Self> {
        let invalid = |reason| TechLogError::InvalidFileName {
            name: base.to_string(),
            reason,
        };

        let prefix = base
            .as_bytes()
            .get(..DATE_PREFIX_LEN)
            .ok_or_else(|| invalid("name is shorter than YYMMDDHH"))?;
        if !prefix.iter().all(u8::is_ascii_digit) {
            return Err(invalid("prefix is not YYMMDDHH digits"));
        }

        let field = |i: usize| u32::from(prefix[i] - b'0') * 10 + u32::from(prefix[i + 1] - b'0');
        let year = 2000 + field(0) as i32;
        Self::new(year, field(2), field(4), field(6))
            .ok_or_else(|| invalid("prefix does not name a calendar hour"))
    }

    /// Returns the four-digit year.
    #[must_use]
    pub fn year(&self) -> i32 {
        chrono::Datelike::year(&self.date)
    }

    /// Returns the month (1-12).
    #[must_use]
    pub fn month(&self) -> u32 {
        chrono::Datelike::month(&self.date)
    }

    /// Returns the day of month.
    #[must_use]
    pub fn day(&self) -> u32 {
        chrono::Datelike::day(&self.date)
    }

    /// Returns the hour (0-23).
    #[must_use]
    pub const fn hour(&self) -> u32 {
        self.hour
    }

    /// Returns `(year, month, day, hour)`.
    #[must_use]
    pub fn as_tuple(&self) -> (i32, u32, u32, u32) {
        (self.year(), self.month(), self.day(), self.hour)
    }

    /// Composes an absolute timestamp from the in-entry time of day.
    ///
    /// Returns `None` if any component is out of range.
    #[must_use]
    pub fn timestamp(&self, minute: u32, second: u32, micros: u32) -> Option<NaiveDateTime> {
        self.date
            .and_hms_micro_opt(self.hour, minute, second, micros)
    }
}

impl std::fmt::Display for DateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:02}:00:00", self.date.format("%Y-%m-%d"), self.hour)
    }
}
