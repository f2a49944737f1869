//! Export configuration

use crate::fetcher::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGES};
use crate::{DisplayOutput, SortDirection, SortField};
use chrono::{Datelike, NaiveDate, Utc};
use std::path::PathBuf;

/// First year the news archive has data for.
pub const FIRST_EXPORT_YEAR: i32 = 2011;

/// Settings shared by [`DayExporter`](super::DayExporter) and
/// [`RangeScheduler`](super::RangeScheduler)
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Export root; artifacts land under `<root>/<year>/<MonthName>/`
    pub root_dir: PathBuf,
    /// First year exported (inclusive)
    pub start_year: i32,
    /// Last year exported (inclusive)
    pub end_year: i32,
    /// Stories per page
    pub page_size: u32,
    /// Page ceiling per day
    pub max_pages: u32,
    /// Sort field sent to the API
    pub sort_field: SortField,
    /// Sort direction sent to the API
    pub sort_direction: SortDirection,
    /// Detail level sent to the API
    pub display: DisplayOutput,
    /// Days on or after this date are not exported
    pub today: NaiveDate,
}

impl ExportConfig {
    /// Defaults: 2011 through the current UTC year, 100 stories per page,
    /// 1000 pages per day, `created:asc`, full detail.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        let today = Utc::now().date_naive();
        Self {
            root_dir: root_dir.into(),
            start_year: FIRST_EXPORT_YEAR,
            end_year: today.year(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: MAX_PAGES,
            sort_field: SortField::Created,
            sort_direction: SortDirection::Asc,
            display: DisplayOutput::Full,
            today,
        }
    }

    /// Restrict the span to `start..=end`.
    pub fn with_years(mut self, start: i32, end: i32) -> Self {
        self.start_year = start;
        self.end_year = end;
        self
    }

    /// Override the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Override the page ceiling.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Pin "today", mostly for tests and reproducible reruns.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 {
            return Err("page size must be at least 1".to_string());
        }
        if self.max_pages == 0 {
            return Err("max pages must be at least 1".to_string());
        }
        if self.start_year > self.end_year {
            return Err(format!(
                "start year ({}) must not be after end year ({})",
                self.start_year, self.end_year
            ));
        }
        if NaiveDate::from_ymd_opt(self.start_year, 1, 1).is_none()
            || NaiveDate::from_ymd_opt(self.end_year, 12, 31).is_none()
        {
            return Err(format!(
                "year range {}..={} is out of the supported calendar",
                self.start_year, self.end_year
            ));
        }
        Ok(())
    }
}
