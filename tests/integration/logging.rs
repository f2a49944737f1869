//! Integration tests for logging and tracing

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[test]
fn test_tracing_subscriber_initialization() {
    // Using try_init since another test may have installed a subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("newsfeed_archiver=debug")),
        )
        .with_test_writer()
        .try_init();

    info!("This is an info message");
    warn!("This is a warning message");
    error!("This is an error message");
}

#[test]
fn test_tracing_json_format() {
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new("newsfeed_archiver=info"))
        .with_test_writer()
        .try_init();

    info!(date = "2015-03-01", stories = 42, "Day exported");
}

#[test]
fn test_env_filter_directives_parse() {
    for directive in [
        "info",
        "newsfeed_archiver=debug",
        "warn,newsfeed_archiver::stream=trace",
        "newsfeed_archiver::export=debug,newsfeed_archiver=info",
    ] {
        assert!(
            EnvFilter::try_new(directive).is_ok(),
            "directive {directive} did not parse"
        );
    }
}

#[test]
fn test_tracing_spans() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("newsfeed_archiver=debug"))
        .with_test_writer()
        .try_init();

    let span = tracing::info_span!("export_day", date = "2015-03-01", year = 2015);
    let _enter = span.enter();
    info!(page = 0, "Inside span");
}
