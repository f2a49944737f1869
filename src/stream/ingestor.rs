//! Websocket session driver
//!
//! `Connecting -> Streaming -> Closed | Failed`. Shutdown observed while
//! connecting or waiting for a frame ends the session cleanly. Every other
//! failure is returned to the caller; [`StreamIngestor::run_with_reconnect`]
//! layers a bounded backoff loop on top for transport-class failures.

use crate::fetcher::news_config::NEWS_API_CONFIG;
use crate::metrics::StreamMetrics;
use crate::shutdown::SharedShutdown;
use crate::stream::config::calculate_backoff;
use crate::stream::{
    EventHandler, IngestorConfig, ReconnectPolicy, StreamBuffer, StreamError, StreamResult,
};
use crate::StreamEvent;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio_tungstenite::connect_async_with_config;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn, Instrument};

const TOO_MANY_CONNECTIONS: &str =
    "server reports too many connections, wait before reconnecting or disconnect other sessions";
const SERVER_UNAVAILABLE: &str = "server unavailable, delay before attempting reconnect";

/// Append the API token to a stream URL.
pub fn stream_url_with_token(url: &str, token: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{}={token}", NEWS_API_CONFIG.token_param)
}

/// URL without its query string, safe to log
fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// Owns one stream connection at a time
pub struct StreamIngestor {
    url: String,
    handler: Arc<dyn EventHandler>,
    buffer: Arc<StreamBuffer>,
    config: IngestorConfig,
    shutdown: SharedShutdown,
}

impl StreamIngestor {
    /// Create an ingestor for `url` (token already included).
    pub fn new(
        url: impl Into<String>,
        handler: Arc<dyn EventHandler>,
        buffer: Arc<StreamBuffer>,
        shutdown: SharedShutdown,
    ) -> Self {
        Self {
            url: url.into(),
            handler,
            buffer,
            config: IngestorConfig::default(),
            shutdown,
        }
    }

    /// Override session settings.
    pub fn with_config(mut self, config: IngestorConfig) -> Self {
        self.config = config;
        self
    }

    /// Buffer events are recorded in; handlers use it to confirm events.
    pub fn buffer(&self) -> &Arc<StreamBuffer> {
        &self.buffer
    }

    /// Run a single session until shutdown (`Ok`) or failure (`Err`).
    pub async fn run(&self) -> StreamResult<()> {
        let mut handled = 0;
        self.run_session(&mut handled).await
    }

    /// Run sessions back to back, reconnecting after transport failures.
    ///
    /// Gives up after `policy.max_attempts` consecutive failures. A session
    /// that handled at least one event resets the count.
    pub async fn run_with_reconnect(&self, policy: &ReconnectPolicy) -> StreamResult<()> {
        let mut attempt: u32 = 0;

        loop {
            let mut handled = 0;
            let err = match self.run_session(&mut handled).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            if !err.is_retryable() {
                return Err(err);
            }
            if self.shutdown.is_shutdown_requested() {
                return Ok(());
            }
            if handled > 0 {
                attempt = 0;
            }
            if attempt >= policy.max_attempts {
                warn!(attempts = attempt, "Giving up on stream after repeated failures");
                return Err(err);
            }

            let backoff = calculate_backoff(attempt);
            attempt += 1;
            warn!(
                attempt = attempt,
                max_attempts = policy.max_attempts,
                backoff_ms = backoff.as_millis(),
                "Stream session failed: {}. Reconnecting",
                err
            );

            tokio::select! {
                biased;
                _ = self.shutdown.wait_for_shutdown() => return Ok(()),
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }

    async fn run_session(&self, handled: &mut u64) -> StreamResult<()> {
        let span = tracing::info_span!("stream_session", url = %redact(&self.url));
        let result = self.session(handled).instrument(span).await;
        match &result {
            Ok(()) => StreamMetrics::record_session_end("clean"),
            Err(_) => StreamMetrics::record_session_end("error"),
        }
        result
    }

    async fn session(&self, handled: &mut u64) -> StreamResult<()> {
        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(self.config.max_message_size);
        ws_config.max_frame_size = Some(self.config.max_message_size);

        let connect = connect_async_with_config(self.url.as_str(), Some(ws_config), false);
        let (socket, _response) = tokio::select! {
            biased;
            _ = self.shutdown.wait_for_shutdown() => {
                info!("Shutdown requested before stream connected");
                return Ok(());
            }
            result = connect => result.map_err(connect_error)?,
        };

        info!("Stream connected");
        let (mut write, mut read) = socket.split();

        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.wait_for_shutdown() => {
                    // Best effort; the peer may already be gone
                    let _ = write.send(Message::Close(None)).await;
                    info!(handled = *handled, "Stream closed on shutdown");
                    return Ok(());
                }
                next = read.next() => next,
            };

            let message = match next {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(read_error(e)),
                None => {
                    return Err(StreamError::ConnectionClosed(
                        "stream ended without a close frame".to_string(),
                    ))
                }
            };

            match message {
                Message::Text(text) => self.dispatch(text.as_bytes()).await?,
                Message::Binary(bytes) => self.dispatch(bytes.as_ref()).await?,
                Message::Close(frame) => {
                    let reason = frame
                        .map(|f| format!("{} {}", f.code, f.reason))
                        .unwrap_or_else(|| "no close frame".to_string());
                    return Err(StreamError::ConnectionClosed(reason));
                }
                _ => continue,
            }
            *handled += 1;
        }
    }

    /// Decode, buffer, then hand off one message.
    async fn dispatch(&self, payload: &[u8]) -> StreamResult<()> {
        let event: StreamEvent = serde_json::from_slice(payload).map_err(|e| {
            StreamMetrics::record_failed("decode");
            StreamError::Decode(e.to_string())
        })?;

        if let Err(e) = self.buffer.put(&event).await {
            StreamMetrics::record_failed("buffer");
            return Err(e.into());
        }
        StreamMetrics::record_received();
        debug!(id = event.data.id, action = %event.data.action, "Event buffered");

        if let Err(e) = self.handler.handle(&event).await {
            StreamMetrics::record_failed("handler");
            return Err(StreamError::Handler(e));
        }
        StreamMetrics::record_handled();

        if self.config.auto_clear_buffer {
            self.buffer.remove(&event).await?;
        }
        Ok(())
    }
}

fn connect_error(error: WsError) -> StreamError {
    match error {
        WsError::Http(response) => {
            let code = response.status().as_u16();
            match code {
                429 => StreamError::Server {
                    code,
                    message: TOO_MANY_CONNECTIONS.to_string(),
                },
                500 | 503 => StreamError::Server {
                    code,
                    message: SERVER_UNAVAILABLE.to_string(),
                },
                _ => StreamError::Connect(format!("handshake rejected with status {code}")),
            }
        }
        WsError::Url(e) => StreamError::InvalidUrl(e.to_string()),
        other => StreamError::Connect(other.to_string()),
    }
}

fn read_error(error: WsError) -> StreamError {
    match error {
        WsError::Capacity(e) => StreamError::MessageTooLarge(e.to_string()),
        WsError::ConnectionClosed | WsError::AlreadyClosed => {
            StreamError::ConnectionClosed(error.to_string())
        }
        WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            StreamError::ConnectionClosed(error.to_string())
        }
        other => StreamError::Read(other.to_string()),
    }
}
