//! Production observability metrics for the news archiver
//!
//! Counters and histograms for page requests, day exports and stream
//! sessions.
//!
//! ## Architecture
//!
//! - Uses `metrics` crate for low-overhead metric collection
//! - Prometheus exporter for scraping endpoint (e.g. :9090/metrics)
//! - Recording is a no-op until [`init_metrics`] installs a recorder

use chrono::NaiveDate;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize metrics system with Prometheus exporter
///
/// Call once at startup. Later calls are ignored.
///
/// # Arguments
/// * `addr` - Socket address to bind Prometheus scrape endpoint (e.g., "0.0.0.0:9090")
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        METRICS_INITIALIZED.store(false, Ordering::SeqCst);
        return Err(format!("Failed to install Prometheus exporter: {e}"));
    }

    describe_counter!(
        "news_page_requests_total",
        Unit::Count,
        "Total number of page requests made to the news API"
    );
    describe_histogram!(
        "news_page_request_duration_seconds",
        Unit::Seconds,
        "Page request duration in seconds"
    );
    describe_counter!(
        "export_pages_fetched_total",
        Unit::Count,
        "Pages consumed by day exports"
    );
    describe_counter!(
        "export_stories_written_total",
        Unit::Count,
        "Stories written to committed artifacts"
    );
    describe_counter!(
        "export_days_total",
        Unit::Count,
        "Days handled by the range export, by outcome"
    );
    describe_histogram!(
        "export_day_duration_seconds",
        Unit::Seconds,
        "Wall time spent exporting one day"
    );
    describe_counter!(
        "stream_events_total",
        Unit::Count,
        "Stream events by stage (received, handled, failed)"
    );
    describe_counter!(
        "stream_sessions_total",
        Unit::Count,
        "Stream sessions by how they ended"
    );

    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Whether a recorder has been installed
pub fn is_initialized() -> bool {
    METRICS_INITIALIZED.load(Ordering::SeqCst)
}

/// Timing and status of one page request
pub struct PageRequestMetrics {
    endpoint: &'static str,
    start_time: Instant,
}

impl PageRequestMetrics {
    /// Start recording a request against `endpoint`
    pub fn start(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            start_time: Instant::now(),
        }
    }

    /// Record a response with `status_code`
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "news_page_requests_total",
            "endpoint" => self.endpoint,
            "status" => status_code.to_string(),
        )
        .increment(1);
        histogram!("news_page_request_duration_seconds", "endpoint" => self.endpoint)
            .record(duration.as_secs_f64());

        if status_code == 429 {
            warn!(
                endpoint = self.endpoint,
                duration_ms = duration.as_millis(),
                "News API reported too many requests (429)"
            );
        }
    }

    /// Record a transport failure (no status code)
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "news_page_requests_total",
            "endpoint" => self.endpoint,
            "status" => "network_error",
        )
        .increment(1);
        histogram!("news_page_request_duration_seconds", "endpoint" => self.endpoint)
            .record(duration.as_secs_f64());
    }
}

/// Metrics for one day export
pub struct DayExportMetrics {
    date: NaiveDate,
    start_time: Instant,
}

impl DayExportMetrics {
    /// Start tracking the export of `date`
    pub fn start(date: NaiveDate) -> Self {
        debug!(date = %date, "Day export started");
        Self {
            date,
            start_time: Instant::now(),
        }
    }

    /// One page consumed
    pub fn record_page(&self) {
        counter!("export_pages_fetched_total").increment(1);
    }

    /// Artifact committed with `stories` lines
    pub fn record_exported(&self, stories: u64) {
        let duration = self.start_time.elapsed();
        counter!("export_days_total", "outcome" => "exported").increment(1);
        counter!("export_stories_written_total").increment(stories);
        histogram!("export_day_duration_seconds").record(duration.as_secs_f64());

        info!(
            date = %self.date,
            stories = stories,
            duration_ms = duration.as_millis(),
            "Day exported"
        );
    }

    /// Source returned nothing for the day
    pub fn record_empty(&self) {
        counter!("export_days_total", "outcome" => "empty").increment(1);
        info!(date = %self.date, "No stories for day, nothing written");
    }

    /// Day abandoned
    pub fn record_failure(&self, error: &impl std::fmt::Display) {
        counter!("export_days_total", "outcome" => "failed").increment(1);
        warn!(
            date = %self.date,
            error = %error,
            duration_ms = self.start_time.elapsed().as_millis(),
            "Day export failed"
        );
    }

    /// Day skipped because its artifact exists
    pub fn record_skipped() {
        counter!("export_days_total", "outcome" => "skipped").increment(1);
    }
}

/// Stream event and session counters
pub struct StreamMetrics;

impl StreamMetrics {
    /// Event decoded and buffered
    pub fn record_received() {
        counter!("stream_events_total", "stage" => "received").increment(1);
    }

    /// Handler accepted the event
    pub fn record_handled() {
        counter!("stream_events_total", "stage" => "handled").increment(1);
    }

    /// Handler, decode or buffer failure
    pub fn record_failed(reason: &'static str) {
        counter!("stream_events_total", "stage" => "failed", "reason" => reason).increment(1);
    }

    /// Session ended with `outcome` ("clean", "error")
    pub fn record_session_end(outcome: &'static str) {
        counter!("stream_sessions_total", "outcome" => outcome).increment(1);
    }
}
