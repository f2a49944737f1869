//! Buffer inspection commands
//!
//! Operate on the persistent stream buffer while no stream session holds it.

use crate::stream::buffer::{default_disk_buffer_path, DEFAULT_OPEN_TIMEOUT};
use crate::stream::DiskBuffer;
use clap::{Args, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

use super::CliError;

/// Store location shared by the buffer subcommands
#[derive(Args, Debug, Clone)]
pub struct BufferLocation {
    /// Persistent buffer location (default: system temp dir)
    #[arg(long)]
    pub path: Option<PathBuf>,
}

impl BufferLocation {
    async fn open(&self) -> Result<DiskBuffer, CliError> {
        let path = self.path.clone().unwrap_or_else(default_disk_buffer_path);
        Ok(DiskBuffer::open(&path, DEFAULT_OPEN_TIMEOUT).await?)
    }
}

/// Inspect or prune the persistent stream buffer
#[derive(Subcommand, Debug)]
pub enum BufferCommand {
    /// Print every buffered event as one JSON line
    List {
        /// Store location
        #[command(flatten)]
        location: BufferLocation,
    },
    /// Delete buffered events by id
    Remove {
        /// Store location
        #[command(flatten)]
        location: BufferLocation,
        /// Event ids to delete
        #[arg(long = "id", required = true)]
        ids: Vec<i64>,
    },
}

impl BufferCommand {
    /// Execute the buffer command
    pub async fn execute(&self) -> Result<(), CliError> {
        match self {
            BufferCommand::List { location } => {
                let buffer = location.open().await?;
                let events = buffer.entries().await?;
                let mut stdout = std::io::stdout().lock();
                for event in &events {
                    let line = serde_json::to_string(event)
                        .map_err(|e| CliError::IoError(e.to_string()))?;
                    writeln!(stdout, "{line}")
                        .map_err(|e| CliError::IoError(e.to_string()))?;
                }
                info!(count = events.len(), path = %buffer.path().display(), "Listed buffered events");
                buffer.close().await?;
                Ok(())
            }
            BufferCommand::Remove { location, ids } => {
                let buffer = location.open().await?;
                let mut removed = 0;
                for id in ids {
                    if buffer.remove(*id).await? {
                        removed += 1;
                    } else {
                        info!(id = id, "Event not in buffer");
                    }
                }
                info!(removed = removed, path = %buffer.path().display(), "Removed buffered events");
                buffer.close().await?;
                Ok(())
            }
        }
    }
}
