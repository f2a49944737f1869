//! Gzip-compressed JSON-lines writer with atomic publish
//!
//! Records go to a hidden temporary file next to the target. The target
//! path only appears through a rename after the gzip stream is finished and
//! synced, and only if at least one record was written. Dropping the writer
//! without closing it (error, cancellation) deletes the temporary file.

use crate::output::path::PARTIAL_SUFFIX;
use crate::output::{CloseOutcome, OutputError, OutputResult, OutputWriter, StoryWriter};
use crate::Story;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Buffer size for writes in front of the encoder
const WRITE_BUFFER_BYTES: usize = 64 * 1024;

type Sink = BufWriter<GzEncoder<NamedTempFile>>;

/// Line-delimited JSON writer producing a `.json.gz` artifact
pub struct GzJsonLinesWriter {
    target: PathBuf,
    temp_path: PathBuf,
    sink: Option<Sink>,
    records: u64,
}

impl GzJsonLinesWriter {
    /// Open a writer whose artifact will be published at `target`.
    ///
    /// The parent directory must exist.
    pub fn new(target: &Path) -> OutputResult<Self> {
        let parent = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = target
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| OutputError::InvalidPath(format!("{}", target.display())))?;
        let stem = file_name.split('.').next().unwrap_or(file_name);
        let prefix = format!(".{stem}.");

        let temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(PARTIAL_SUFFIX)
            .tempfile_in(parent)
            .map_err(|e| {
                OutputError::IoError(format!(
                    "Failed to create temp file in {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        let temp_path = temp.path().to_path_buf();

        debug!(target = %target.display(), temp = %temp_path.display(), "Opened artifact writer");

        let encoder = GzEncoder::new(temp, Compression::default());
        Ok(Self {
            target: target.to_path_buf(),
            temp_path,
            sink: Some(BufWriter::with_capacity(WRITE_BUFFER_BYTES, encoder)),
            records: 0,
        })
    }

    /// Path the artifact is published to on a non-empty close
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Path of the in-progress temporary file
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Records written so far
    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Append one record as a single JSON line.
    pub fn write_record<T: Serialize>(&mut self, record: &T) -> OutputResult<()> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| OutputError::IoError("writer already closed".to_string()))?;
        serde_json::to_writer(&mut *sink, record)
            .map_err(|e| OutputError::SerializationError(e.to_string()))?;
        sink.write_all(b"\n")
            .map_err(|e| OutputError::IoError(e.to_string()))?;
        self.records += 1;
        Ok(())
    }

    fn publish(&self, sink: Sink) -> OutputResult<()> {
        let encoder = sink
            .into_inner()
            .map_err(|e| OutputError::FlushError(e.error().to_string()))?;
        let temp = encoder
            .finish()
            .map_err(|e| OutputError::FlushError(format!("Failed to finish gzip stream: {e}")))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync temp file: {e}")))?;
        temp.persist(&self.target).map_err(|e| {
            OutputError::IoError(format!(
                "Failed to publish {}: {}",
                self.target.display(),
                e.error
            ))
        })?;

        // Make the rename durable
        if let Some(parent) = self.target.parent() {
            if let Ok(dir) = std::fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }
}

impl OutputWriter for GzJsonLinesWriter {
    fn flush(&mut self) -> OutputResult<()> {
        match self.sink.as_mut() {
            Some(sink) => sink
                .flush()
                .map_err(|e| OutputError::FlushError(e.to_string())),
            None => Ok(()),
        }
    }

    fn close(mut self) -> OutputResult<CloseOutcome> {
        let Some(sink) = self.sink.take() else {
            return Ok(CloseOutcome::Discarded);
        };

        if self.records == 0 {
            // Dropping the temp file handle deletes it
            drop(sink);
            debug!(target = %self.target.display(), "No records written, artifact discarded");
            return Ok(CloseOutcome::Discarded);
        }

        self.publish(sink)?;
        debug!(
            target = %self.target.display(),
            records = self.records,
            "Artifact committed"
        );
        Ok(CloseOutcome::Committed {
            records: self.records,
        })
    }
}

impl StoryWriter for GzJsonLinesWriter {
    fn write_story(&mut self, story: &Story) -> OutputResult<()> {
        self.write_record(story)
    }

    fn stories_written(&self) -> u64 {
        self.records
    }
}
