//! Single-day export
//!
//! Drains one day's pages into one artifact. Any failure abandons the day
//! and leaves no artifact behind, so the next run retries it.

use crate::export::{ExportConfig, ExportError, ExportUnit};
use crate::fetcher::pagination::{PageCursor, PageOutcome};
use crate::fetcher::{PageFetcher, PageRequest};
use crate::metrics::DayExportMetrics;
use crate::output::path::remove_stale_partials;
use crate::output::{CloseOutcome, DayPath, GzJsonLinesWriter, OutputWriter, StoryWriter};
use crate::{DisplayOutput, SortDirection, SortField};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Instrument};

/// How a day export ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOutcome {
    /// Artifact committed
    Exported,
    /// Source had nothing for the day; no artifact written
    Empty,
}

/// Summary of one day export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayReport {
    /// Day exported
    pub date: NaiveDate,
    /// How it ended
    pub outcome: DayOutcome,
    /// Pages requested
    pub pages_fetched: u32,
    /// Stories written to the artifact
    pub stories_written: u64,
    /// Whether the page ceiling cut the day short
    pub page_cap_reached: bool,
}

/// Drains one day of stories into one artifact
#[derive(Clone)]
pub struct DayExporter {
    fetcher: Arc<dyn PageFetcher>,
    root_dir: PathBuf,
    page_size: u32,
    max_pages: u32,
    sort_field: SortField,
    sort_direction: SortDirection,
    display: DisplayOutput,
}

impl DayExporter {
    /// Create an exporter writing under `config.root_dir`.
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &ExportConfig) -> Self {
        Self {
            fetcher,
            root_dir: config.root_dir.clone(),
            page_size: config.page_size,
            max_pages: config.max_pages,
            sort_field: config.sort_field,
            sort_direction: config.sort_direction,
            display: config.display,
        }
    }

    /// Export root
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Where the artifact for `date` is published
    pub fn artifact_path(&self, date: NaiveDate) -> PathBuf {
        DayPath::new(&self.root_dir, date).build()
    }

    /// Whether `date` already has a committed artifact
    pub fn is_complete(&self, date: NaiveDate) -> bool {
        DayPath::new(&self.root_dir, date).exists()
    }

    fn first_request(&self, date: NaiveDate) -> PageRequest {
        PageRequest {
            date,
            page: 0,
            page_size: self.page_size,
            sort_field: self.sort_field,
            sort_direction: self.sort_direction,
            display: self.display,
        }
    }

    /// Fetch every page of `unit` and publish the artifact if anything was written.
    ///
    /// Dropping the returned future mid-way removes the in-progress file.
    pub async fn export(&self, unit: &ExportUnit) -> Result<DayReport, ExportError> {
        let span = tracing::info_span!("export_day", date = %unit.date, year = unit.year);
        self.export_inner(unit).instrument(span).await
    }

    async fn export_inner(&self, unit: &ExportUnit) -> Result<DayReport, ExportError> {
        let date = unit.date;
        let metrics = DayExportMetrics::start(date);
        let output_err = |source| ExportError::Output { date, source };

        let day = DayPath::new(&self.root_dir, date);
        day.ensure_directories().map_err(output_err)?;
        match remove_stale_partials(&self.root_dir, date) {
            Ok(0) => {}
            Ok(n) => info!(removed = n, "Removed stale partial files"),
            Err(e) => warn!("Could not clean stale partial files: {}", e),
        }

        let mut writer = GzJsonLinesWriter::new(&day.build()).map_err(output_err)?;
        let mut cursor = PageCursor::new(self.first_request(date), self.max_pages);
        let mut page_cap_reached = false;

        while let Some(request) = cursor.next_request() {
            let stories = match self.fetcher.fetch_page(&request).await {
                Ok(stories) => stories,
                Err(source) => {
                    let err = ExportError::Fetch {
                        date,
                        page: request.page,
                        url: self.fetcher.endpoint_url(&request),
                        source,
                    };
                    metrics.record_failure(&err);
                    return Err(err);
                }
            };
            metrics.record_page();

            if let Err(source) = writer.write_stories(&stories) {
                let err = output_err(source);
                metrics.record_failure(&err);
                return Err(err);
            }

            if cursor.advance(stories.len()) == PageOutcome::PageCapReached {
                page_cap_reached = true;
            }
        }

        let outcome = match writer.close() {
            Ok(CloseOutcome::Committed { .. }) => DayOutcome::Exported,
            Ok(CloseOutcome::Discarded) => DayOutcome::Empty,
            Err(source) => {
                let err = output_err(source);
                metrics.record_failure(&err);
                return Err(err);
            }
        };

        let report = DayReport {
            date,
            outcome,
            pages_fetched: cursor.pages_fetched(),
            stories_written: cursor.items_seen(),
            page_cap_reached,
        };
        match outcome {
            DayOutcome::Exported => metrics.record_exported(report.stories_written),
            DayOutcome::Empty => metrics.record_empty(),
        }
        Ok(report)
    }
}
