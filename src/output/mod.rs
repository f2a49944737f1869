//! Export artifact writers

use crate::Story;

pub mod jsonl_gz;
pub mod path;

pub use jsonl_gz::GzJsonLinesWriter;
pub use path::DayPath;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),

    /// Artifact path could not be derived
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// How a writer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The artifact was published with this many records
    Committed {
        /// Records in the published artifact
        records: u64,
    },
    /// Nothing was written, so no artifact was published
    Discarded,
}

/// Generic output writer trait
pub trait OutputWriter {
    /// Flush any buffered data
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and publish the artifact if it has content
    fn close(self) -> OutputResult<CloseOutcome>;
}

/// Trait for writing stories one line at a time
pub trait StoryWriter: OutputWriter {
    /// Write a single story
    fn write_story(&mut self, story: &Story) -> OutputResult<()>;

    /// Write a page of stories in order
    fn write_stories(&mut self, stories: &[Story]) -> OutputResult<()> {
        for story in stories {
            self.write_story(story)?;
        }
        Ok(())
    }

    /// Stories written so far
    fn stories_written(&self) -> u64;
}
