use chrono::NaiveDate;
use newsfeed_archiver::output::path::remove_stale_partials;
use newsfeed_archiver::output::DayPath;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_artifact_layout_uses_year_and_month_name() {
    let path = DayPath::new("/data/news", NaiveDate::from_ymd_opt(2016, 2, 29).unwrap()).build();
    assert_eq!(path, PathBuf::from("/data/news/2016/February/2016_02_29.json.gz"));
}

#[test]
fn test_single_digit_days_are_zero_padded() {
    let day = DayPath::new("out", NaiveDate::from_ymd_opt(2011, 9, 3).unwrap());
    assert_eq!(day.file_name(), "2011_09_03.json.gz");
    assert_eq!(day.directory(), PathBuf::from("out/2011/September"));
}

#[test]
fn test_exists_tracks_final_file_only() {
    let temp = TempDir::new().unwrap();
    let date = NaiveDate::from_ymd_opt(2012, 12, 31).unwrap();
    let day = DayPath::new(temp.path(), date);
    day.ensure_directories().unwrap();

    let partial = day
        .directory()
        .join(format!("{}abc123.partial", day.partial_prefix()));
    std::fs::write(&partial, b"half").unwrap();
    assert!(!day.exists());

    std::fs::write(day.build(), b"done").unwrap();
    assert!(day.exists());
}

#[test]
fn test_stale_partials_are_removed_for_that_day_only() {
    let temp = TempDir::new().unwrap();
    let date = NaiveDate::from_ymd_opt(2013, 5, 6).unwrap();
    let day = DayPath::new(temp.path(), date);
    day.ensure_directories().unwrap();
    let dir = day.directory();

    std::fs::write(dir.join(".2013_05_06.x1.partial"), b"").unwrap();
    std::fs::write(dir.join(".2013_05_06.x2.partial"), b"").unwrap();
    std::fs::write(dir.join(".2013_05_07.x3.partial"), b"").unwrap();
    std::fs::write(dir.join("2013_05_05.json.gz"), b"").unwrap();

    let removed = remove_stale_partials(temp.path(), date).unwrap();

    assert_eq!(removed, 2);
    assert!(dir.join(".2013_05_07.x3.partial").exists());
    assert!(dir.join("2013_05_05.json.gz").exists());
}

#[test]
fn test_stale_partial_cleanup_without_directory_is_noop() {
    let temp = TempDir::new().unwrap();
    let date = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap();
    assert_eq!(remove_stale_partials(temp.path(), date).unwrap(), 0);
}
