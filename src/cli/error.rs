//! CLI error types and conversions

use crate::stream::{BufferError, StreamError};

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// One or more year workers stopped on an error
    #[error("export incomplete: {failed} year(s) failed, rerun to resume")]
    ExportIncomplete {
        /// Number of failed years
        failed: usize,
    },

    /// Stream error
    #[error("stream error: {0}")]
    StreamError(#[from] StreamError),

    /// Buffer error
    #[error("buffer error: {0}")]
    BufferError(#[from] BufferError),

    /// Writing command output failed
    #[error("IO error: {0}")]
    IoError(String),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
