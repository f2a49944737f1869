//! Range scheduler: one worker per year, joined at a single barrier
//!
//! Each worker walks its year's days in order. A day whose artifact exists is
//! skipped without a network call. The first error stops that year only; the
//! other years keep going.

use crate::export::{DayExporter, DayOutcome, ExportConfig, ExportError, ExportUnit};
use crate::metrics::DayExportMetrics;
use crate::shutdown::SharedShutdown;
use chrono::{Days, NaiveDate};
use indicatif::ProgressBar;
use std::collections::HashMap;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Days of `year` to export, in order.
///
/// The span is `Jan 1 ..` the earlier of next Jan 1 and `today`, both
/// exclusive, so the current (still growing) day is never exported.
/// Including `today` would commit a partial day that later runs then skip
/// as complete; it is picked up by the first run on the following day.
pub fn day_units(year: i32, today: NaiveDate) -> Vec<ExportUnit> {
    let Some(first) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return Vec::new();
    };
    let year_end = NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap_or(NaiveDate::MAX);
    let end = year_end.min(today);

    let mut units = Vec::new();
    let mut date = first;
    while date < end {
        units.push(ExportUnit::new(date));
        match date.checked_add_days(Days::new(1)) {
            Some(next) => date = next,
            None => break,
        }
    }
    units
}

/// Outcome of one year worker
#[derive(Debug)]
pub struct YearReport {
    /// Year walked
    pub year: i32,
    /// Days with a newly committed artifact
    pub exported: u64,
    /// Days skipped because their artifact already existed
    pub skipped: u64,
    /// Days the source had nothing for
    pub empty: u64,
    /// Stories written across the year's exported days
    pub stories: u64,
    /// Error that stopped the worker
    pub error: Option<ExportError>,
    /// Whether the worker stopped because shutdown was requested
    pub cancelled: bool,
}

impl YearReport {
    fn new(year: i32) -> Self {
        Self {
            year,
            exported: 0,
            skipped: 0,
            empty: 0,
            stories: 0,
            error: None,
            cancelled: false,
        }
    }
}

/// Outcome of a whole range
#[derive(Debug, Default)]
pub struct ScheduleReport {
    /// One entry per year, sorted by year
    pub years: Vec<YearReport>,
}

impl ScheduleReport {
    /// Days exported across all years
    pub fn total_exported(&self) -> u64 {
        self.years.iter().map(|y| y.exported).sum()
    }

    /// Days skipped across all years
    pub fn total_skipped(&self) -> u64 {
        self.years.iter().map(|y| y.skipped).sum()
    }

    /// Empty days across all years
    pub fn total_empty(&self) -> u64 {
        self.years.iter().map(|y| y.empty).sum()
    }

    /// Years whose worker stopped on an error
    pub fn failed_years(&self) -> impl Iterator<Item = &YearReport> {
        self.years.iter().filter(|y| y.error.is_some())
    }

    /// Whether any year failed
    pub fn has_errors(&self) -> bool {
        self.failed_years().next().is_some()
    }

    /// Whether any year stopped for shutdown
    pub fn was_cancelled(&self) -> bool {
        self.years.iter().any(|y| y.cancelled)
    }
}

/// Fans a year span out over one task per year
pub struct RangeScheduler {
    exporter: DayExporter,
    start_year: i32,
    end_year: i32,
    today: NaiveDate,
    shutdown: Option<SharedShutdown>,
    progress: Option<ProgressBar>,
}

impl RangeScheduler {
    /// Create a scheduler over `config`'s year span.
    pub fn new(exporter: DayExporter, config: &ExportConfig) -> Self {
        Self {
            exporter,
            start_year: config.start_year,
            end_year: config.end_year,
            today: config.today,
            shutdown: None,
            progress: None,
        }
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Tick `progress` once per day handled.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Every unit in the span, year by year
    pub fn units(&self) -> Vec<ExportUnit> {
        (self.start_year..=self.end_year)
            .flat_map(|year| day_units(year, self.today))
            .collect()
    }

    /// Run every year worker and wait for all of them.
    pub async fn run(&self) -> ScheduleReport {
        let mut workers = JoinSet::new();
        let mut worker_years = HashMap::new();

        for year in self.start_year..=self.end_year {
            let units = day_units(year, self.today);
            if units.is_empty() {
                continue;
            }
            let handle = workers.spawn(run_year(
                self.exporter.clone(),
                year,
                units,
                self.shutdown.clone(),
                self.progress.clone(),
            ));
            worker_years.insert(handle.id(), year);
        }

        info!(workers = workers.len(), "Started year workers");

        let mut report = ScheduleReport::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(year_report) => report.years.push(year_report),
                Err(join_err) => {
                    let year = worker_years.get(&join_err.id()).copied().unwrap_or_default();
                    error!(year = year, "Year worker did not finish: {}", join_err);
                    let mut year_report = YearReport::new(year);
                    year_report.error = Some(ExportError::Worker(join_err.to_string()));
                    report.years.push(year_report);
                }
            }
        }
        report.years.sort_by_key(|y| y.year);

        info!(
            exported = report.total_exported(),
            skipped = report.total_skipped(),
            empty = report.total_empty(),
            failed_years = report.failed_years().count(),
            "Range export finished"
        );
        report
    }
}

async fn run_year(
    exporter: DayExporter,
    year: i32,
    units: Vec<ExportUnit>,
    shutdown: Option<SharedShutdown>,
    progress: Option<ProgressBar>,
) -> YearReport {
    let mut report = YearReport::new(year);

    for unit in units {
        if shutdown.as_ref().is_some_and(|s| s.is_shutdown_requested()) {
            report.cancelled = true;
            break;
        }

        if exporter.is_complete(unit.date) {
            DayExportMetrics::record_skipped();
            report.skipped += 1;
            if let Some(bar) = &progress {
                bar.inc(1);
            }
            continue;
        }

        let result = match &shutdown {
            Some(shutdown) => tokio::select! {
                biased;
                _ = shutdown.wait_for_shutdown() => None,
                result = exporter.export(&unit) => Some(result),
            },
            None => Some(exporter.export(&unit).await),
        };

        let Some(result) = result else {
            warn!(year = year, date = %unit.date, "Shutdown requested, abandoning day in progress");
            report.cancelled = true;
            break;
        };

        match result {
            Ok(day) => {
                match day.outcome {
                    DayOutcome::Exported => {
                        report.exported += 1;
                        report.stories += day.stories_written;
                    }
                    DayOutcome::Empty => report.empty += 1,
                }
                if let Some(bar) = &progress {
                    bar.inc(1);
                }
            }
            Err(e) => {
                error!(year = year, date = %unit.date, "Year worker stopped: {}", e);
                report.error = Some(e);
                break;
            }
        }
    }

    report
}
