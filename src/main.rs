//! Main entry point for the newsfeed-archiver CLI

use clap::Parser;
use newsfeed_archiver::cli::{Cli, Commands};
use newsfeed_archiver::fetcher::news_config::SUPPORT_INFO;
use newsfeed_archiver::metrics;
use newsfeed_archiver::shutdown::ShutdownCoordinator;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting.
///
/// Logs go to stderr so `stream` and `buffer list` output stays clean on stdout.
fn init_tracing(debug: bool) {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let default_directive = if debug {
        "newsfeed_archiver=debug"
    } else {
        "newsfeed_archiver=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Some(addr) = cli.metrics_addr {
        if let Err(e) = metrics::init_metrics(addr) {
            error!("Failed to start metrics exporter: {}", e);
            std::process::exit(1);
        }
        info!(addr = %addr, "Metrics exporter listening");
    }

    let shutdown = ShutdownCoordinator::shared();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - finishing current work and stopping...");
                shutdown.request_shutdown();
            }
        }
    });

    let result = match cli.command {
        Commands::Export(ref args) => args
            .execute(shutdown.clone())
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!(e)),
        Commands::Stream(ref args) => args
            .execute(shutdown.clone())
            .await
            .map_err(|e| anyhow::anyhow!(e)),
        Commands::Buffer(ref cmd) => cmd.execute().await.map_err(|e| anyhow::anyhow!(e)),
        Commands::Info => {
            println!("{SUPPORT_INFO}");
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}
