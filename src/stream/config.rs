//! Stream configuration constants

use std::time::Duration;

/// Default read limit for one stream message (65,536,000 bytes).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1000 << 16;

/// Initial reconnect backoff in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum reconnect backoff in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30000;

/// Default number of consecutive reconnect attempts.
pub const DEFAULT_MAX_RECONNECTS: u32 = 5;

/// Per-session ingestor settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestorConfig {
    /// Largest message or frame accepted, in bytes
    pub max_message_size: usize,
    /// Remove each event from the buffer once its handler succeeds
    pub auto_clear_buffer: bool,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            auto_clear_buffer: false,
        }
    }
}

/// Reconnect policy for [`StreamIngestor::run_with_reconnect`](super::StreamIngestor::run_with_reconnect)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive failed sessions tolerated before giving up
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RECONNECTS,
        }
    }
}

/// Calculate exponential backoff delay
pub fn calculate_backoff(retry_count: u32) -> Duration {
    let factor = 2u64.checked_pow(retry_count).unwrap_or(u64::MAX);
    let delay_ms = INITIAL_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS);
    Duration::from_millis(delay_ms)
}
