//! Export command implementation

use crate::export::{DayExporter, ExportConfig, RangeScheduler, ScheduleReport, FIRST_EXPORT_YEAR};
use crate::fetcher::news_config::NEWS_API_CONFIG;
use crate::fetcher::news_http::NewsHttpClient;
use crate::fetcher::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGES};
use crate::shutdown::SharedShutdown;
use crate::{DisplayOutput, SortDirection, SortField};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::CliError;

/// Arguments for exporting the REST history
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// API token
    #[arg(long, env = "NEWSFEED_API_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Export root directory
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// First year to export
    #[arg(long, default_value_t = FIRST_EXPORT_YEAR)]
    pub start_year: i32,

    /// Last year to export (default: current year)
    #[arg(long)]
    pub end_year: Option<i32>,

    /// Stories per page (1-100)
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub page_size: u32,

    /// Page ceiling per day
    #[arg(long, default_value_t = MAX_PAGES, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_pages: u32,

    /// Sort field: updated, created, or id
    #[arg(long, default_value = "created")]
    pub sort_field: SortField,

    /// Sort direction: asc or desc
    #[arg(long, default_value = "asc")]
    pub sort_direction: SortDirection,

    /// Detail level: headline, abstract, or full
    #[arg(long, default_value = "full")]
    pub display: DisplayOutput,

    /// API base URL
    #[arg(long, default_value = NEWS_API_CONFIG.base_url)]
    pub base_url: String,

    /// Disable the progress bar
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

impl ExportArgs {
    /// Build the export configuration from flags
    pub fn to_config(&self) -> Result<ExportConfig, CliError> {
        let mut config = ExportConfig::new(&self.dir);
        config.start_year = self.start_year;
        if let Some(end_year) = self.end_year {
            config.end_year = end_year;
        }
        config.page_size = self.page_size;
        config.max_pages = self.max_pages;
        config.sort_field = self.sort_field;
        config.sort_direction = self.sort_direction;
        config.display = self.display;

        config.validate().map_err(CliError::InvalidArgument)?;
        Ok(config)
    }

    /// Execute the export
    pub async fn execute(&self, shutdown: SharedShutdown) -> Result<ScheduleReport, CliError> {
        if self.token.trim().is_empty() {
            return Err(CliError::ConfigurationError(
                "API token must not be empty".to_string(),
            ));
        }
        let config = self.to_config()?;

        info!(
            dir = %config.root_dir.display(),
            start_year = config.start_year,
            end_year = config.end_year,
            "Starting news export"
        );

        let fetcher = Arc::new(NewsHttpClient::new(&self.base_url, &self.token));
        let exporter = DayExporter::new(fetcher, &config);
        let mut scheduler = RangeScheduler::new(exporter, &config).with_shutdown(shutdown);

        let progress = if self.no_progress {
            None
        } else {
            let bar = create_progress_bar(scheduler.units().len() as u64);
            scheduler = scheduler.with_progress(bar.clone());
            Some(bar)
        };

        let report = scheduler.run().await;

        if let Some(bar) = progress {
            bar.finish_and_clear();
        }

        for year in report.failed_years() {
            if let Some(e) = &year.error {
                error!(year = year.year, "Year incomplete: {}", e);
            }
        }
        if report.was_cancelled() {
            warn!("Export interrupted; rerun to resume from the first missing day");
        }
        info!(
            exported = report.total_exported(),
            skipped = report.total_skipped(),
            empty = report.total_empty(),
            "Export finished"
        );

        let failed = report.failed_years().count();
        if failed > 0 {
            return Err(CliError::ExportIncomplete { failed });
        }
        Ok(report)
    }
}

fn create_progress_bar(total_days: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_days);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} days ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message("exporting");
    pb
}
