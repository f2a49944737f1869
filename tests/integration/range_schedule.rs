//! Integration tests for the year-parallel range export

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use newsfeed_archiver::export::{DayExporter, ExportConfig, ExportError, RangeScheduler};
use newsfeed_archiver::fetcher::{FetcherError, FetcherResult, PageFetcher, PageRequest};
use newsfeed_archiver::shutdown::ShutdownCoordinator;
use newsfeed_archiver::Story;
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// One short page per day; stories are derived from the date.
struct DailyFetcher {
    calls: Arc<Mutex<usize>>,
    failing_year: Option<i32>,
    empty_day: Option<NaiveDate>,
    stall: bool,
}

impl DailyFetcher {
    fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(0)),
            failing_year: None,
            empty_day: None,
            stall: false,
        }
    }
}

#[async_trait]
impl PageFetcher for DailyFetcher {
    async fn fetch_page(&self, request: &PageRequest) -> FetcherResult<Vec<Story>> {
        *self.calls.lock().unwrap() += 1;
        if self.stall {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if self.failing_year == Some(request.date.year()) {
            return Err(FetcherError::UnexpectedResponse {
                status: 503,
                body: "maintenance".to_string(),
            });
        }
        if self.empty_day == Some(request.date) {
            return Ok(Vec::new());
        }
        let id = request.date.num_days_from_ce() as i64;
        Ok(vec![serde_json::from_value(json!({
            "id": id,
            "title": format!("news for {}", request.date)
        }))
        .unwrap()])
    }

    fn endpoint_url(&self, request: &PageRequest) -> String {
        format!("mock://news?date={}", request.date)
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn artifacts_in(dir: &Path) -> usize {
    walk(dir)
        .into_iter()
        .filter(|p| p.ends_with(".json.gz"))
        .count()
}

fn walk(dir: &Path) -> Vec<String> {
    let mut out = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                out.extend(walk(&path));
            } else {
                out.push(path.to_string_lossy().into_owned());
            }
        }
    }
    out
}

#[tokio::test]
async fn test_second_run_makes_no_requests_and_keeps_bytes() {
    let temp = TempDir::new().unwrap();
    let config = ExportConfig::new(temp.path())
        .with_years(2015, 2015)
        .with_today(ymd(2015, 1, 6));

    let first = DailyFetcher::new();
    let first_calls = first.calls.clone();
    let exporter = DayExporter::new(Arc::new(first), &config);
    let report = RangeScheduler::new(exporter, &config).run().await;

    assert_eq!(report.total_exported(), 5);
    assert_eq!(*first_calls.lock().unwrap(), 5);
    let artifact = temp.path().join("2015/January/2015_01_03.json.gz");
    let before = std::fs::read(&artifact).unwrap();

    let second = DailyFetcher::new();
    let second_calls = second.calls.clone();
    let exporter = DayExporter::new(Arc::new(second), &config);
    let report = RangeScheduler::new(exporter, &config).run().await;

    assert_eq!(*second_calls.lock().unwrap(), 0);
    assert_eq!(report.total_skipped(), 5);
    assert_eq!(report.total_exported(), 0);
    assert_eq!(std::fs::read(&artifact).unwrap(), before);
}

#[tokio::test]
async fn test_failing_year_does_not_stop_other_years() {
    let temp = TempDir::new().unwrap();
    let config = ExportConfig::new(temp.path())
        .with_years(2012, 2014)
        .with_today(ymd(2030, 1, 1));

    let mut fetcher = DailyFetcher::new();
    fetcher.failing_year = Some(2013);
    let exporter = DayExporter::new(Arc::new(fetcher), &config);
    let report = RangeScheduler::new(exporter, &config).run().await;

    let years: Vec<i32> = report.years.iter().map(|y| y.year).collect();
    assert_eq!(years, vec![2012, 2013, 2014]);

    let failed: Vec<i32> = report.failed_years().map(|y| y.year).collect();
    assert_eq!(failed, vec![2013]);
    assert!(matches!(
        report.years[1].error,
        Some(ExportError::Fetch { .. })
    ));
    assert_eq!(report.years[1].exported, 0);

    assert_eq!(report.years[0].exported, 366);
    assert_eq!(report.years[2].exported, 365);
    assert_eq!(artifacts_in(&temp.path().join("2013")), 0);
    assert_eq!(artifacts_in(temp.path()), 366 + 365);
}

#[tokio::test]
async fn test_today_is_never_exported() {
    let temp = TempDir::new().unwrap();
    let config = ExportConfig::new(temp.path())
        .with_years(2021, 2021)
        .with_today(ymd(2021, 1, 3));

    let fetcher = DailyFetcher::new();
    let calls = fetcher.calls.clone();
    let exporter = DayExporter::new(Arc::new(fetcher), &config);
    let scheduler = RangeScheduler::new(exporter, &config);
    assert_eq!(scheduler.units().len(), 2);

    let report = scheduler.run().await;

    assert_eq!(*calls.lock().unwrap(), 2);
    assert_eq!(report.total_exported(), 2);
    assert!(temp.path().join("2021/January/2021_01_02.json.gz").exists());
    assert!(!temp.path().join("2021/January/2021_01_03.json.gz").exists());
}

#[tokio::test]
async fn test_empty_day_is_fetched_again_on_rerun() {
    let temp = TempDir::new().unwrap();
    let config = ExportConfig::new(temp.path())
        .with_years(2016, 2016)
        .with_today(ymd(2016, 1, 4));

    let mut fetcher = DailyFetcher::new();
    fetcher.empty_day = Some(ymd(2016, 1, 2));
    let exporter = DayExporter::new(Arc::new(fetcher), &config);
    let report = RangeScheduler::new(exporter, &config).run().await;
    assert_eq!(report.total_exported(), 2);
    assert_eq!(report.total_empty(), 1);

    let rerun = DailyFetcher::new();
    let calls = rerun.calls.clone();
    let exporter = DayExporter::new(Arc::new(rerun), &config);
    let report = RangeScheduler::new(exporter, &config).run().await;

    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(report.total_exported(), 1);
    assert_eq!(report.total_skipped(), 2);
}

#[tokio::test]
async fn test_future_years_spawn_no_work() {
    let temp = TempDir::new().unwrap();
    let config = ExportConfig::new(temp.path())
        .with_years(2040, 2041)
        .with_today(ymd(2025, 6, 1));

    let fetcher = DailyFetcher::new();
    let calls = fetcher.calls.clone();
    let exporter = DayExporter::new(Arc::new(fetcher), &config);
    let report = RangeScheduler::new(exporter, &config).run().await;

    assert!(report.years.is_empty());
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_shutdown_abandons_day_in_progress() {
    let temp = TempDir::new().unwrap();
    let config = ExportConfig::new(temp.path())
        .with_years(2017, 2018)
        .with_today(ymd(2030, 1, 1));

    let mut fetcher = DailyFetcher::new();
    fetcher.stall = true;
    let exporter = DayExporter::new(Arc::new(fetcher), &config);
    let shutdown = ShutdownCoordinator::shared();
    let scheduler = RangeScheduler::new(exporter, &config).with_shutdown(shutdown.clone());

    let trigger = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            shutdown.request_shutdown();
        })
    };

    let report = tokio::time::timeout(Duration::from_secs(5), scheduler.run())
        .await
        .expect("scheduler ignored shutdown");
    trigger.await.unwrap();

    assert!(report.was_cancelled());
    assert!(!report.has_errors());
    assert_eq!(report.total_exported(), 0);
    assert!(walk(temp.path()).is_empty(), "files left behind: {:?}", walk(temp.path()));
}
