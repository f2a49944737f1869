//! Day-partitioned export of the REST history
//!
//! [`RangeScheduler`] walks every day of a year span, one task per year, and
//! asks [`DayExporter`] to drain each day whose artifact does not exist yet.

use crate::fetcher::FetcherError;
use crate::output::OutputError;
use chrono::{Datelike, NaiveDate};

pub mod config;
pub mod day;
pub mod scheduler;

pub use config::{ExportConfig, FIRST_EXPORT_YEAR};
pub use day::{DayExporter, DayOutcome, DayReport};
pub use scheduler::{day_units, RangeScheduler, ScheduleReport, YearReport};

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A page request failed; the day was abandoned
    #[error("fetching {date} page {page} from {url} failed: {source}")]
    Fetch {
        /// Day being exported
        date: NaiveDate,
        /// Page that failed
        page: u32,
        /// Request URL without credentials
        url: String,
        /// Underlying fetch error
        #[source]
        source: FetcherError,
    },

    /// Writing or publishing the artifact failed
    #[error("writing artifact for {date} failed: {source}")]
    Output {
        /// Day being exported
        date: NaiveDate,
        /// Underlying output error
        #[source]
        source: OutputError,
    },

    /// A year worker panicked or was aborted
    #[error("year worker failed: {0}")]
    Worker(String),
}

/// One calendar day scheduled for export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExportUnit {
    /// Year the unit belongs to
    pub year: i32,
    /// Day to export
    pub date: NaiveDate,
}

impl ExportUnit {
    /// Unit for `date`
    pub fn new(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            date,
        }
    }
}

impl std::fmt::Display for ExportUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.date)
    }
}
