//! Stream command implementation
//!
//! Connects to the live news stream and prints every event as one JSON line
//! on stdout. Logs go to stderr, so stdout can be piped straight into a file.

use crate::fetcher::news_config::NEWS_API_CONFIG;
use crate::shutdown::SharedShutdown;
use crate::stream::buffer::DEFAULT_OPEN_TIMEOUT;
use crate::stream::ingestor::stream_url_with_token;
use crate::stream::{
    BufferConfig, EventHandler, HandlerError, IngestorConfig, ReconnectPolicy, StreamBuffer,
    StreamIngestor, DEFAULT_MAX_MESSAGE_SIZE,
};
use crate::StreamEvent;
use async_trait::async_trait;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::CliError;

/// Arguments for streaming live events
#[derive(Parser, Debug)]
pub struct StreamArgs {
    /// API token
    #[arg(long, env = "NEWSFEED_API_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Stream URL
    #[arg(long, default_value = NEWS_API_CONFIG.stream_url)]
    pub url: String,

    /// Keep received events in memory until handled
    #[arg(long, default_value_t = false)]
    pub memory_buffer: bool,

    /// Keep received events in the persistent buffer store
    #[arg(long, default_value_t = false)]
    pub disk_buffer: bool,

    /// Persistent buffer location (default: system temp dir)
    #[arg(long)]
    pub disk_buffer_path: Option<PathBuf>,

    /// Seconds to wait for another process to release the buffer store
    #[arg(long, default_value_t = DEFAULT_OPEN_TIMEOUT.as_secs())]
    pub buffer_open_timeout: u64,

    /// Also delete from the persistent buffer when an event is cleared
    #[arg(long, default_value_t = false)]
    pub prune_disk_buffer: bool,

    /// Clear each event from the buffer once it has been printed
    #[arg(long, default_value_t = false)]
    pub auto_clear_buffer: bool,

    /// Largest accepted message in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    pub max_message_size: usize,

    /// Reconnect with backoff after transport failures
    #[arg(long, default_value_t = false)]
    pub reconnect: bool,

    /// Consecutive reconnect attempts before giving up
    #[arg(long, default_value_t = ReconnectPolicy::default().max_attempts)]
    pub max_reconnects: u32,
}

impl StreamArgs {
    /// Buffer backends selected by flags
    pub fn buffer_config(&self) -> BufferConfig {
        BufferConfig {
            use_memory_buffer: self.memory_buffer,
            use_disk_buffer: self.disk_buffer,
            disk_buffer_path: self.disk_buffer_path.clone(),
            open_timeout: Duration::from_secs(self.buffer_open_timeout),
            prune_disk_on_remove: self.prune_disk_buffer,
        }
    }

    /// Execute the stream session(s)
    pub async fn execute(&self, shutdown: SharedShutdown) -> Result<(), CliError> {
        if self.token.trim().is_empty() {
            return Err(CliError::ConfigurationError(
                "API token must not be empty".to_string(),
            ));
        }
        if self.max_message_size == 0 {
            return Err(CliError::InvalidArgument(
                "max message size must be at least 1 byte".to_string(),
            ));
        }

        let buffer = Arc::new(StreamBuffer::open(&self.buffer_config()).await?);
        let config = IngestorConfig {
            max_message_size: self.max_message_size,
            auto_clear_buffer: self.auto_clear_buffer,
        };
        let ingestor = StreamIngestor::new(
            stream_url_with_token(&self.url, &self.token),
            Arc::new(StdoutHandler),
            buffer.clone(),
            shutdown,
        )
        .with_config(config);

        info!(url = %self.url, reconnect = self.reconnect, "Starting news stream");

        let result = if self.reconnect {
            let policy = ReconnectPolicy {
                max_attempts: self.max_reconnects,
            };
            ingestor.run_with_reconnect(&policy).await
        } else {
            ingestor.run().await
        };

        drop(ingestor);
        if let Ok(buffer) = Arc::try_unwrap(buffer) {
            buffer.close().await?;
        }

        result?;
        info!("News stream stopped");
        Ok(())
    }
}

/// Prints each event as one JSON line on stdout
pub struct StdoutHandler;

#[async_trait]
impl EventHandler for StdoutHandler {
    async fn handle(&self, event: &StreamEvent) -> Result<(), HandlerError> {
        let line = serde_json::to_string(event)?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}")?;
        stdout.flush()?;
        Ok(())
    }
}
