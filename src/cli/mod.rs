//! CLI command implementations

pub mod buffer;
pub mod error;
pub mod export;
pub mod stream;

pub use buffer::BufferCommand;
pub use error::CliError;
pub use export::ExportArgs;
pub use stream::StreamArgs;

use clap::{Parser, Subcommand};
use std::net::SocketAddr;

/// Newsfeed Archiver CLI
#[derive(Parser, Debug)]
#[command(name = "newsfeed-archiver")]
#[command(about = "Archive a vendor news feed from its REST history and live stream", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging (ignored when RUST_LOG is set)
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export every day of a year span to gzip JSON-lines files
    Export(ExportArgs),

    /// Stream live events to stdout
    Stream(StreamArgs),

    /// Inspect or prune the persistent stream buffer
    #[command(subcommand)]
    Buffer(BufferCommand),

    /// Print support information
    Info,
}
