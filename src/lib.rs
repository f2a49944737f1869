//! # Newsfeed Archiver Library
//!
//! Durable ingestion of a vendor news feed through two independent channels:
//!
//! - **REST export**: every calendar day in a multi-year span is drained page by
//!   page into one gzip-compressed, newline-delimited JSON file. The set of files
//!   on disk is the resume ledger, so re-running an export only fetches the days
//!   that are still missing.
//! - **Streaming ingestion**: a long-lived websocket session decodes one event at
//!   a time, records it in a [`stream::StreamBuffer`] (in memory, on disk, or
//!   both) and then hands it to an [`stream::EventHandler`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use newsfeed_archiver::export::{DayExporter, ExportConfig, RangeScheduler};
//! use newsfeed_archiver::fetcher::news_http::NewsHttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Arc::new(NewsHttpClient::with_default_base("my-token"));
//! let config = ExportConfig::new("./archive").with_years(2020, 2021);
//! let exporter = DayExporter::new(fetcher, &config);
//!
//! let report = RangeScheduler::new(exporter, &config).run().await;
//! println!("{} days exported", report.total_exported());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - Page requests against the REST history API
//! - [`output`] - Artifact paths and the atomic gzip JSON-lines writer
//! - [`export`] - Day export and the per-year range scheduler
//! - [`stream`] - Websocket ingestion and the event buffer
//! - [`shutdown`] - Cooperative cancellation shared by both paths
//! - [`metrics`] - Prometheus counters and histograms

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// CLI command implementations
pub mod cli;

/// Day export and range scheduling
pub mod export;

/// REST page fetchers
pub mod fetcher;

/// Observability metrics
pub mod metrics;

/// Export artifact writers
pub mod output;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

/// Streaming ingestion and event buffering
pub mod stream;

/// One news story as returned by the REST history API.
///
/// `created` and `updated` are kept exactly as the vendor sent them so an
/// archived line is byte-for-byte what the API returned for known fields.
/// Fields this crate does not model are preserved in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Story {
    /// Vendor story identifier
    pub id: i64,
    /// Byline
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
    /// Creation time as sent by the vendor
    #[serde(default, deserialize_with = "null_as_default")]
    pub created: String,
    /// Last update time as sent by the vendor
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated: String,
    /// Headline
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Short abstract
    #[serde(default, deserialize_with = "null_as_default")]
    pub teaser: String,
    /// Full body (present when the full display output was requested)
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
    /// Canonical story URL
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    /// Attached images
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: Vec<Image>,
    /// Channel tags
    #[serde(default, deserialize_with = "null_as_default")]
    pub channels: Vec<ChannelTag>,
    /// Referenced stocks
    #[serde(default, deserialize_with = "null_as_default")]
    pub stocks: Vec<Stock>,
    /// Free-form tags
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<ChannelTag>,
    /// Fields not modelled above
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Story {
    /// Parse the creation time, accepting RFC 3339 and RFC 2822 spellings.
    pub fn created_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_vendor_time(&self.created)
    }

    /// Parse the last update time, accepting RFC 3339 and RFC 2822 spellings.
    pub fn updated_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_vendor_time(&self.updated)
    }
}

fn parse_vendor_time(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
}

/// Story image reference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Image {
    /// Size label (e.g. "thumb", "small")
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: String,
    /// Image URL
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
}

/// Stock referenced by a story
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stock {
    /// Ticker
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// CUSIP, when the vendor knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cusip: Option<String>,
}

/// Named channel or tag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelTag {
    /// Display name
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// Envelope of one message received from the news stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamEvent {
    /// Stream protocol version
    #[serde(default)]
    pub api_version: String,
    /// Message kind (e.g. "News/v1")
    #[serde(default)]
    pub kind: String,
    /// Event payload
    pub data: EventData,
}

impl StreamEvent {
    /// Key under which this event is buffered.
    pub fn buffer_key(&self) -> String {
        self.data.id.to_string()
    }
}

/// Payload of a stream event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventData {
    /// Action applied to the story ("Created", "Updated", "Removed")
    #[serde(default)]
    pub action: String,
    /// Vendor-assigned event identifier
    pub id: i64,
    /// Story content, absent for some removal events
    #[serde(default)]
    pub content: Option<EventContent>,
    /// Time the event was emitted
    #[serde(default, with = "rfc3339_millis::option", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Story content carried by a stream event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventContent {
    /// Story identifier
    pub id: i64,
    /// Revision of the story this event carries
    #[serde(default, deserialize_with = "null_as_default")]
    pub revision_id: i64,
    /// Content type (e.g. "story")
    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub content_type: String,
    /// Headline
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Full body
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
    /// Authors
    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: Vec<String>,
    /// Short abstract
    #[serde(default, deserialize_with = "null_as_default")]
    pub teaser: String,
    /// Canonical story URL
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    /// Free-form tags
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    /// Referenced securities
    #[serde(default, deserialize_with = "null_as_default")]
    pub securities: Vec<Security>,
    /// Channel names
    #[serde(default, deserialize_with = "null_as_default")]
    pub channels: Vec<String>,
    /// Story creation time
    #[serde(default, with = "rfc3339_millis::option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Story update time
    #[serde(default, with = "rfc3339_millis::option", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Security referenced by streamed content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Security {
    /// Ticker
    #[serde(default, deserialize_with = "null_as_default")]
    pub symbol: String,
    /// Listing exchange
    #[serde(default, deserialize_with = "null_as_default")]
    pub exchange: String,
    /// Whether this is the story's primary security
    #[serde(default, deserialize_with = "null_as_default")]
    pub primary: bool,
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// RFC 3339 timestamps with exactly three fractional digits on output.
/// Missing, `null` and empty values decode to `None`.
mod rfc3339_millis {
    pub mod option {
        use chrono::{DateTime, SecondsFormat, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) if !raw.is_empty() => DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| Some(dt.with_timezone(&Utc)))
                    .map_err(serde::de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}

/// Field the REST API sorts a day's stories by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    /// Last update time
    Updated,
    /// Creation time
    #[default]
    Created,
    /// Story identifier
    Id,
}

impl std::fmt::Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SortField::Updated => "updated",
            SortField::Created => "created",
            SortField::Id => "id",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "updated" => Ok(SortField::Updated),
            "created" => Ok(SortField::Created),
            "id" => Ok(SortField::Id),
            _ => Err(format!(
                "Invalid sort field: {s}. Valid options: updated, created, id"
            )),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(format!("Invalid sort direction: {s}. Valid options: asc, desc")),
        }
    }
}

/// Level of detail requested for each story
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayOutput {
    /// Headline only
    Headline,
    /// Headline and teaser
    Abstract,
    /// Everything including the body
    #[default]
    Full,
}

impl std::fmt::Display for DisplayOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DisplayOutput::Headline => "headline",
            DisplayOutput::Abstract => "abstract",
            DisplayOutput::Full => "full",
        };
        write!(f, "{s}")
    }
}

impl FromStr for DisplayOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "headline" => Ok(DisplayOutput::Headline),
            "abstract" => Ok(DisplayOutput::Abstract),
            "full" => Ok(DisplayOutput::Full),
            _ => Err(format!(
                "Invalid display output: {s}. Valid options: headline, abstract, full"
            )),
        }
    }
}
