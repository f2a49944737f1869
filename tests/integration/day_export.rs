//! Integration tests for single-day export

use async_trait::async_trait;
use chrono::NaiveDate;
use flate2::read::GzDecoder;
use newsfeed_archiver::export::{DayExporter, DayOutcome, ExportConfig, ExportError, ExportUnit};
use newsfeed_archiver::fetcher::{FetcherError, FetcherResult, PageFetcher, PageRequest};
use newsfeed_archiver::Story;
use serde_json::json;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Serves `pages[i]` stories for page `i`, optionally failing one page.
struct PagedFetcher {
    pages: Vec<usize>,
    fail_page: Option<u32>,
    calls: Arc<Mutex<usize>>,
}

impl PagedFetcher {
    fn new(pages: Vec<usize>) -> Self {
        Self {
            pages,
            fail_page: None,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    fn failing_on(mut self, page: u32) -> Self {
        self.fail_page = Some(page);
        self
    }
}

#[async_trait]
impl PageFetcher for PagedFetcher {
    async fn fetch_page(&self, request: &PageRequest) -> FetcherResult<Vec<Story>> {
        *self.calls.lock().unwrap() += 1;
        if self.fail_page == Some(request.page) {
            return Err(FetcherError::NetworkError("connection reset".to_string()));
        }
        let len = self.pages.get(request.page as usize).copied().unwrap_or(0);
        Ok((0..len)
            .map(|i| {
                let id = request.page as i64 * 100 + i as i64;
                serde_json::from_value(json!({
                    "id": id,
                    "title": format!("story {id}"),
                    "created": "2018-06-01T12:00:00Z",
                    "sponsored": false
                }))
                .unwrap()
            })
            .collect())
    }

    fn endpoint_url(&self, request: &PageRequest) -> String {
        format!("mock://news?date={}&page={}", request.date, request.page)
    }
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 6, 1).unwrap()
}

fn read_artifact(path: &Path) -> Vec<Story> {
    let file = std::fs::File::open(path).unwrap();
    BufReader::new(GzDecoder::new(file))
        .lines()
        .map(|line| serde_json::from_str(&line.unwrap()).unwrap())
        .collect()
}

fn files_under(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_full_pages_then_short_page_are_concatenated_in_order() {
    let temp = TempDir::new().unwrap();
    let fetcher = PagedFetcher::new(vec![3, 3, 1]);
    let calls = fetcher.calls.clone();
    let config = ExportConfig::new(temp.path()).with_page_size(3);
    let exporter = DayExporter::new(Arc::new(fetcher), &config);

    let report = exporter.export(&ExportUnit::new(date())).await.unwrap();

    assert_eq!(*calls.lock().unwrap(), 3);
    assert_eq!(report.outcome, DayOutcome::Exported);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.stories_written, 7);
    assert!(!report.page_cap_reached);

    let stories = read_artifact(&exporter.artifact_path(date()));
    let ids: Vec<i64> = stories.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 100, 101, 102, 200]);
    assert_eq!(stories[0].title, "story 0");
    assert_eq!(stories[0].extra.get("sponsored"), Some(&json!(false)));
}

#[tokio::test]
async fn test_exact_multiple_needs_trailing_empty_page() {
    let temp = TempDir::new().unwrap();
    let fetcher = PagedFetcher::new(vec![2, 2]);
    let calls = fetcher.calls.clone();
    let config = ExportConfig::new(temp.path()).with_page_size(2);
    let exporter = DayExporter::new(Arc::new(fetcher), &config);

    let report = exporter.export(&ExportUnit::new(date())).await.unwrap();

    assert_eq!(*calls.lock().unwrap(), 3);
    assert_eq!(report.stories_written, 4);
    assert_eq!(read_artifact(&exporter.artifact_path(date())).len(), 4);
}

#[tokio::test]
async fn test_failure_mid_day_leaves_no_file() {
    let temp = TempDir::new().unwrap();
    let fetcher = PagedFetcher::new(vec![2, 2, 2]).failing_on(2);
    let config = ExportConfig::new(temp.path()).with_page_size(2);
    let exporter = DayExporter::new(Arc::new(fetcher), &config);

    let err = exporter.export(&ExportUnit::new(date())).await.unwrap_err();

    assert!(matches!(err, ExportError::Fetch { page: 2, .. }));
    assert!(err.to_string().contains("2018-06-01"));
    assert!(!exporter.is_complete(date()));
    let month_dir = temp.path().join("2018").join("June");
    assert!(files_under(&month_dir).is_empty(), "temporary file left behind");
}

#[tokio::test]
async fn test_empty_day_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let fetcher = PagedFetcher::new(vec![]);
    let calls = fetcher.calls.clone();
    let config = ExportConfig::new(temp.path());
    let exporter = DayExporter::new(Arc::new(fetcher), &config);

    let report = exporter.export(&ExportUnit::new(date())).await.unwrap();

    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(report.outcome, DayOutcome::Empty);
    assert!(!exporter.artifact_path(date()).exists());
}

#[tokio::test]
async fn test_rerun_after_failure_replaces_stale_partial() {
    let temp = TempDir::new().unwrap();
    let config = ExportConfig::new(temp.path()).with_page_size(2);
    let month_dir = temp.path().join("2018").join("June");
    std::fs::create_dir_all(&month_dir).unwrap();
    std::fs::write(month_dir.join(".2018_06_01.crash.partial"), b"junk").unwrap();

    let exporter = DayExporter::new(Arc::new(PagedFetcher::new(vec![1])), &config);
    exporter.export(&ExportUnit::new(date())).await.unwrap();

    assert_eq!(files_under(&month_dir), vec!["2018_06_01.json.gz".to_string()]);
}
