//! Streaming ingestion and event buffering
//!
//! A [`StreamIngestor`] owns one websocket session. Every message is decoded,
//! recorded in the [`StreamBuffer`], and only then passed to the registered
//! [`EventHandler`], one event at a time in arrival order.

use crate::StreamEvent;
use async_trait::async_trait;

pub mod buffer;
pub mod config;
pub mod ingestor;

pub use buffer::{BufferBackend, BufferConfig, BufferError, DiskBuffer, MemoryBuffer, StreamBuffer};
pub use config::{IngestorConfig, ReconnectPolicy, DEFAULT_MAX_MESSAGE_SIZE};
pub use ingestor::StreamIngestor;

/// Error type returned by event handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Stream errors
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Server refused the handshake with an overload or availability status
    #[error("server error {code}: {message}")]
    Server {
        /// HTTP status from the handshake
        code: u16,
        /// What the caller should do about it
        message: String,
    },

    /// Socket could not be opened
    #[error("connect error: {0}")]
    Connect(String),

    /// Stream URL could not be used
    #[error("invalid stream URL: {0}")]
    InvalidUrl(String),

    /// Read failed mid-session
    #[error("read error: {0}")]
    Read(String),

    /// Incoming frame exceeded the configured limit
    #[error("message too large: {0}")]
    MessageTooLarge(String),

    /// Peer closed the session
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Message did not decode into an event
    #[error("decode error: {0}")]
    Decode(String),

    /// Buffer write failed
    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),

    /// Handler rejected an event
    #[error("handler error: {0}")]
    Handler(#[source] HandlerError),
}

impl StreamError {
    /// Whether a new session may succeed where this one failed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StreamError::Server { .. }
                | StreamError::Connect(_)
                | StreamError::Read(_)
                | StreamError::ConnectionClosed(_)
        )
    }
}

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Business logic invoked once per buffered event
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle one event. An error ends the session.
    async fn handle(&self, event: &StreamEvent) -> Result<(), HandlerError>;
}
