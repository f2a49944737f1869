//! Event buffer with independently selectable backends
//!
//! - [`MemoryBuffer`]: ordered, volatile, lost on exit
//! - [`DiskBuffer`]: embedded SQLite store, survives restarts, one process
//!   at a time
//!
//! Backends are enabled by flags in [`BufferConfig`] and may be combined.
//! Every backend holds at most one entry per event id.

use crate::StreamEvent;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqliteLockingMode};
use sqlx::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument, warn};

/// Buffered events, keyed by decimal event id
const CREATE_EVENTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS news_websocket (\
    key TEXT PRIMARY KEY NOT NULL, \
    event TEXT NOT NULL\
)";

/// File name of the persistent store when no path is configured
pub const DEFAULT_DISK_BUFFER_FILE: &str = "bz_news_websocket_buffer.db";

/// How long to wait for another process to release the persistent store
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Buffer errors
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// Another process kept the persistent store open past the wait limit
    #[error("buffer store {path} is locked by another process")]
    Locked {
        /// Store path
        path: String,
    },

    /// Persistent store could not be opened or created
    #[error("failed to open buffer store {path}: {message}")]
    Open {
        /// Store path
        path: String,
        /// Underlying error
        message: String,
    },

    /// Read or write statement failed
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Event could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Backend selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferConfig {
    /// Keep events in memory
    pub use_memory_buffer: bool,
    /// Keep events in the persistent store
    pub use_disk_buffer: bool,
    /// Persistent store location; defaults to [`default_disk_buffer_path`]
    pub disk_buffer_path: Option<PathBuf>,
    /// Wait limit when another process holds the store
    pub open_timeout: Duration,
    /// Make [`StreamBuffer::remove`] delete from the persistent store too
    pub prune_disk_on_remove: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            use_memory_buffer: false,
            use_disk_buffer: false,
            disk_buffer_path: None,
            open_timeout: DEFAULT_OPEN_TIMEOUT,
            prune_disk_on_remove: false,
        }
    }
}

impl BufferConfig {
    /// Memory backend only
    pub fn memory() -> Self {
        Self {
            use_memory_buffer: true,
            ..Self::default()
        }
    }

    /// Persistent backend only, at `path` or the default location
    pub fn disk(path: Option<PathBuf>) -> Self {
        Self {
            use_disk_buffer: true,
            disk_buffer_path: path,
            ..Self::default()
        }
    }

    /// Persistent store location this config resolves to
    pub fn resolved_disk_path(&self) -> PathBuf {
        self.disk_buffer_path
            .clone()
            .unwrap_or_else(default_disk_buffer_path)
    }
}

/// `<system temp dir>/bz_news_websocket_buffer.db`
pub fn default_disk_buffer_path() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_DISK_BUFFER_FILE)
}

/// Volatile, arrival-ordered buffer
#[derive(Debug, Default)]
pub struct MemoryBuffer {
    events: Mutex<Vec<StreamEvent>>,
}

impl MemoryBuffer {
    /// Empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StreamEvent>> {
        // A poisoned lock still holds a consistent Vec
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert `event`, replacing an entry with the same id in place
    pub fn put(&self, event: &StreamEvent) {
        let mut events = self.lock();
        match events.iter_mut().find(|e| e.data.id == event.data.id) {
            Some(existing) => *existing = event.clone(),
            None => events.push(event.clone()),
        }
    }

    /// Remove the entry with `id`; returns whether one existed
    pub fn remove(&self, id: i64) -> bool {
        let mut events = self.lock();
        let before = events.len();
        events.retain(|e| e.data.id != id);
        events.len() != before
    }

    /// Entry with `id`, if buffered
    pub fn get(&self, id: i64) -> Option<StreamEvent> {
        self.lock().iter().find(|e| e.data.id == id).cloned()
    }

    /// Snapshot in arrival order
    pub fn entries(&self) -> Vec<StreamEvent> {
        self.lock().clone()
    }

    /// Number of buffered events
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Persistent buffer on an embedded SQLite store
///
/// The store is opened in exclusive locking mode and the lock is taken during
/// [`open`](Self::open), so a second process waits for it and then fails with
/// [`BufferError::Locked`].
pub struct DiskBuffer {
    conn: AsyncMutex<SqliteConnection>,
    path: PathBuf,
}

impl std::fmt::Debug for DiskBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskBuffer").field("path", &self.path).finish()
    }
}

impl DiskBuffer {
    /// Open or create the store at `path`, waiting up to `timeout` for
    /// another process to release it.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn open(path: &Path, timeout: Duration) -> BufferResult<Self> {
        let store = path.display().to_string();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete)
            .locking_mode(SqliteLockingMode::Exclusive)
            .busy_timeout(timeout);

        let mut conn = SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| open_error(&store, e))?;

        // BEGIN EXCLUSIVE takes the file lock; exclusive locking mode keeps it
        // after COMMIT until the connection closes
        sqlx::query("BEGIN EXCLUSIVE")
            .execute(&mut conn)
            .await
            .map_err(|e| open_error(&store, e))?;
        sqlx::query(CREATE_EVENTS_TABLE)
            .execute(&mut conn)
            .await
            .map_err(|e| open_error(&store, e))?;
        sqlx::query("COMMIT")
            .execute(&mut conn)
            .await
            .map_err(|e| open_error(&store, e))?;

        info!(path = %store, "Opened persistent event buffer");
        Ok(Self {
            conn: AsyncMutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    /// Store location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `event` in a single statement, overwriting any entry with the same id.
    ///
    /// An overwritten entry keeps its original position in [`entries`](Self::entries).
    pub async fn put(&self, event: &StreamEvent) -> BufferResult<()> {
        let value =
            serde_json::to_string(event).map_err(|e| BufferError::Serialization(e.to_string()))?;

        let mut conn = self.conn.lock().await;
        sqlx::query(
            "INSERT INTO news_websocket (key, event) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET event = excluded.event",
        )
        .bind(event.buffer_key())
        .bind(value)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Delete the entry with `id`; returns whether one existed
    pub async fn remove(&self, id: i64) -> BufferResult<bool> {
        let mut conn = self.conn.lock().await;
        let result = sqlx::query("DELETE FROM news_websocket WHERE key = ?")
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Entry with `id`, if stored
    pub async fn get(&self, id: i64) -> BufferResult<Option<StreamEvent>> {
        let mut conn = self.conn.lock().await;
        let value: Option<String> =
            sqlx::query_scalar("SELECT event FROM news_websocket WHERE key = ?")
                .bind(id.to_string())
                .fetch_optional(&mut *conn)
                .await?;
        value.as_deref().map(decode).transpose()
    }

    /// Every stored event, in first-arrival order
    pub async fn entries(&self) -> BufferResult<Vec<StreamEvent>> {
        let mut conn = self.conn.lock().await;
        let values: Vec<String> =
            sqlx::query_scalar("SELECT event FROM news_websocket ORDER BY rowid")
                .fetch_all(&mut *conn)
                .await?;
        values.iter().map(|v| decode(v)).collect()
    }

    /// Number of stored events
    pub async fn len(&self) -> BufferResult<u64> {
        let mut conn = self.conn.lock().await;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news_websocket")
            .fetch_one(&mut *conn)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> BufferResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Close the store and release its lock.
    ///
    /// Dropping a `DiskBuffer` also releases the lock, but only once the
    /// connection's worker has shut down.
    pub async fn close(self) -> BufferResult<()> {
        self.conn.into_inner().close().await?;
        debug!(path = %self.path.display(), "Closed persistent event buffer");
        Ok(())
    }
}

fn decode(value: &str) -> BufferResult<StreamEvent> {
    serde_json::from_str(value).map_err(|e| BufferError::Serialization(e.to_string()))
}

fn open_error(path: &str, error: sqlx::Error) -> BufferError {
    if let sqlx::Error::Database(db) = &error {
        // Primary code SQLITE_BUSY (5) or SQLITE_LOCKED (6) once the busy timeout ran out
        let primary = db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| code & 0xff);
        if matches!(primary, Some(5) | Some(6)) {
            return BufferError::Locked {
                path: path.to_string(),
            };
        }
    }
    BufferError::Open {
        path: path.to_string(),
        message: error.to_string(),
    }
}

/// One enabled backend
#[derive(Debug)]
pub enum BufferBackend {
    /// Volatile ordered list
    Memory(MemoryBuffer),
    /// Persistent embedded store
    Disk(DiskBuffer),
}

impl BufferBackend {
    async fn put(&self, event: &StreamEvent) -> BufferResult<()> {
        match self {
            BufferBackend::Memory(buffer) => {
                buffer.put(event);
                Ok(())
            }
            BufferBackend::Disk(buffer) => buffer.put(event).await,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            BufferBackend::Memory(_) => "memory",
            BufferBackend::Disk(_) => "disk",
        }
    }
}

/// Holding area for in-flight stream events
#[derive(Debug)]
pub struct StreamBuffer {
    backends: Vec<BufferBackend>,
    prune_disk_on_remove: bool,
}

impl StreamBuffer {
    /// Open every backend enabled in `config`.
    ///
    /// Fails immediately if the persistent store cannot be opened.
    pub async fn open(config: &BufferConfig) -> BufferResult<Self> {
        let mut backends = Vec::new();
        if config.use_memory_buffer {
            backends.push(BufferBackend::Memory(MemoryBuffer::new()));
        }
        if config.use_disk_buffer {
            let path = config.resolved_disk_path();
            backends.push(BufferBackend::Disk(
                DiskBuffer::open(&path, config.open_timeout).await?,
            ));
        }
        if backends.is_empty() {
            debug!("No buffer backend enabled, events will not be buffered");
        }

        Ok(Self {
            backends,
            prune_disk_on_remove: config.prune_disk_on_remove,
        })
    }

    /// Buffer with no backends; `put` and `remove` do nothing
    pub fn disabled() -> Self {
        Self {
            backends: Vec::new(),
            prune_disk_on_remove: false,
        }
    }

    /// Enabled backends
    pub fn backends(&self) -> &[BufferBackend] {
        &self.backends
    }

    /// Memory backend, if enabled
    pub fn memory(&self) -> Option<&MemoryBuffer> {
        self.backends.iter().find_map(|b| match b {
            BufferBackend::Memory(m) => Some(m),
            _ => None,
        })
    }

    /// Persistent backend, if enabled
    pub fn disk(&self) -> Option<&DiskBuffer> {
        self.backends.iter().find_map(|b| match b {
            BufferBackend::Disk(d) => Some(d),
            _ => None,
        })
    }

    /// Insert or overwrite `event` in every enabled backend
    pub async fn put(&self, event: &StreamEvent) -> BufferResult<()> {
        for backend in &self.backends {
            backend.put(event).await?;
        }
        Ok(())
    }

    /// Drop `event` from the memory backend.
    ///
    /// The persistent backend keeps its entry unless `prune_disk_on_remove`
    /// was set; use [`DiskBuffer::remove`] to delete explicitly.
    pub async fn remove(&self, event: &StreamEvent) -> BufferResult<()> {
        for backend in &self.backends {
            match backend {
                BufferBackend::Memory(buffer) => {
                    buffer.remove(event.data.id);
                }
                BufferBackend::Disk(buffer) if self.prune_disk_on_remove => {
                    buffer.remove(event.data.id).await?;
                }
                BufferBackend::Disk(_) => {}
            }
        }
        Ok(())
    }

    /// Close every backend, releasing the persistent store lock.
    pub async fn close(self) -> BufferResult<()> {
        for backend in self.backends {
            if let BufferBackend::Disk(disk) = backend {
                disk.close().await?;
            }
        }
        Ok(())
    }

    /// Buffered events for replay.
    ///
    /// Reads the persistent backend when enabled, since it is the one that
    /// survives restarts, otherwise the memory backend.
    pub async fn pending(&self) -> BufferResult<Vec<StreamEvent>> {
        if let Some(disk) = self.disk() {
            return disk.entries().await;
        }
        if let Some(memory) = self.memory() {
            return Ok(memory.entries());
        }
        warn!("Replay requested but no buffer backend is enabled");
        Ok(Vec::new())
    }
}
