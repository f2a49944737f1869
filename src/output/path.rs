//! Day artifact paths
//!
//! Every exported day lives at a fixed location derived only from the
//! export root and the date:
//!
//! ```text
//! <root>/<year>/<MonthName>/<YYYY_MM_DD>.json.gz
//! ```
//!
//! The resume ledger is the set of these files, so the layout must stay
//! stable across releases.
//!
//! # Usage Example
//!
//! ```rust
//! use newsfeed_archiver::output::DayPath;
//! use chrono::NaiveDate;
//! use std::path::PathBuf;
//!
//! let date = NaiveDate::from_ymd_opt(2011, 1, 2).unwrap();
//! let path = DayPath::new(PathBuf::from("archive"), date).build();
//! assert_eq!(path, PathBuf::from("archive/2011/January/2011_01_02.json.gz"));
//! ```

use super::{OutputError, OutputResult};
use chrono::{Datelike, NaiveDate};
use std::path::{Path, PathBuf};

/// File extension of a day artifact
pub const ARTIFACT_EXTENSION: &str = "json.gz";

/// Suffix of the in-progress temporary file next to an artifact
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Path builder for one day's artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayPath {
    root_dir: PathBuf,
    date: NaiveDate,
}

impl DayPath {
    /// Create a path for `date` under `root_dir`
    pub fn new(root_dir: impl Into<PathBuf>, date: NaiveDate) -> Self {
        Self {
            root_dir: root_dir.into(),
            date,
        }
    }

    /// Day this path addresses
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Directory holding the artifact: `<root>/<year>/<MonthName>`
    pub fn directory(&self) -> PathBuf {
        self.root_dir
            .join(self.date.year().to_string())
            .join(self.date.format("%B").to_string())
    }

    /// File name of the artifact: `YYYY_MM_DD.json.gz`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.date.format("%Y_%m_%d"), ARTIFACT_EXTENSION)
    }

    /// Prefix of temporary files for this day (hidden, so listings skip them)
    pub fn partial_prefix(&self) -> String {
        format!(".{}.", self.date.format("%Y_%m_%d"))
    }

    /// Build the complete artifact path
    pub fn build(&self) -> PathBuf {
        self.directory().join(self.file_name())
    }

    /// Whether the artifact for this day has been committed
    pub fn exists(&self) -> bool {
        self.build().is_file()
    }

    /// Ensure year and month directories exist
    pub fn ensure_directories(&self) -> OutputResult<()> {
        let dir_path = self.directory();
        std::fs::create_dir_all(&dir_path).map_err(|e| {
            OutputError::IoError(format!(
                "Failed to create directory {}: {}",
                dir_path.display(),
                e
            ))
        })?;
        Ok(())
    }
}

/// Remove leftover temporary files for `date` under `root_dir`.
///
/// Only a hard crash leaves these behind. Returns how many were removed.
pub fn remove_stale_partials(root_dir: &Path, date: NaiveDate) -> OutputResult<usize> {
    let day = DayPath::new(root_dir, date);
    let dir = day.directory();
    if !dir.is_dir() {
        return Ok(0);
    }

    let prefix = day.partial_prefix();
    let entries = std::fs::read_dir(&dir).map_err(|e| {
        OutputError::IoError(format!("Failed to read directory {}: {}", dir.display(), e))
    })?;

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| OutputError::IoError(e.to_string()))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&prefix) && name.ends_with(PARTIAL_SUFFIX) {
            std::fs::remove_file(entry.path()).map_err(|e| {
                OutputError::IoError(format!(
                    "Failed to remove stale partial {}: {}",
                    entry.path().display(),
                    e
                ))
            })?;
            removed += 1;
        }
    }
    Ok(removed)
}
