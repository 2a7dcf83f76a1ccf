//! Scrape configuration: time window, downstream action, retry policy

use crate::types::{ScrapeError, ScrapeResult};
use chrono::{Duration as ChronoDuration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// ApiHub OData products endpoint
pub const DEFAULT_CATALOG_URL: &str = "https://scihub.copernicus.eu/apihub/odata/v1/Products";

/// Maximum entries requested per page
pub const PAGE_SIZE: usize = 100;

/// Pause between successive page requests
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(3);

pub const DEFAULT_DATASET_VERSION: &str = "v1.1";

/// Provenance tag added to every `.met.json`
pub const QUERY_API: &str = "odata";

const FILTER_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Half-open ingestion-date window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> ScrapeResult<Self> {
        if end <= start {
            return Err(ScrapeError::Config(format!(
                "End time {} is not after start time {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse ISO-8601 start/end times (optional fraction, optional trailing `Z`)
    pub fn parse(start: &str, end: &str) -> ScrapeResult<Self> {
        Self::new(parse_iso8601(start)?, parse_iso8601(end)?)
    }

    /// The 24 hours ending at `now`
    pub fn trailing_day(now: NaiveDateTime) -> Self {
        Self {
            start: now - ChronoDuration::days(1),
            end: now,
        }
    }

    pub fn trailing_day_from_now() -> Self {
        Self::trailing_day(Utc::now().naive_utc())
    }

    /// OData filter selecting IW SLC products ingested inside the window
    pub fn odata_filter(&self) -> String {
        format!(
            "IngestionDate ge datetime'{}' and IngestionDate lt datetime'{}' and substringof('IW_SLC',Name)",
            self.start.format(FILTER_TIME_FORMAT),
            self.end.format(FILTER_TIME_FORMAT)
        )
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} through {}",
            self.start.format(FILTER_TIME_FORMAT),
            self.end.format(FILTER_TIME_FORMAT)
        )
    }
}

/// Parse a UTC timestamp such as `2020-01-03T17:08:15.123456Z`
pub fn parse_iso8601(value: &str) -> ScrapeResult<NaiveDateTime> {
    let trimmed = value.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| ScrapeError::Config(format!("Invalid ISO-8601 time '{}': {}", value, e)))
}

/// What to do with products missing from the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Report only
    ReportOnly,
    /// Write dataset directories for missing products
    CreateOnly,
    /// Write dataset directories and hand them to the ingestor
    Ingest,
}

impl Action {
    pub fn from_flags(ingest_missing: bool, create_only: bool) -> ScrapeResult<Self> {
        match (ingest_missing, create_only) {
            (true, true) => Err(ScrapeError::Config(
                "Cannot specify ingest_missing=true and create_only=true".to_string(),
            )),
            (true, false) => Ok(Action::Ingest),
            (false, true) => Ok(Action::CreateOnly),
            (false, false) => Ok(Action::ReportOnly),
        }
    }
}

/// Catalog response encoding requested via `$format`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    Xml,
    Json,
}

impl FeedFormat {
    pub fn as_param(&self) -> &'static str {
        match self {
            FeedFormat::Xml => "xml",
            FeedFormat::Json => "json",
        }
    }
}

/// Exponential backoff for transport-level failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    pub max_tries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_tries: 8,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(32),
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// No waiting between attempts
    pub fn immediate(max_tries: u32) -> Self {
        Self {
            max_tries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }
}

/// Complete configuration of one scrape invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    pub catalog_url: String,
    /// Index base URL; a product exists when `<index_url>/<identifier>` answers 200
    pub index_url: String,
    pub datasets_cfg: PathBuf,
    pub window: TimeWindow,
    pub dataset_version: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Accepted for compatibility, not used
    pub email_to: Vec<String>,
    pub browse: bool,
    pub ingest_missing: bool,
    pub create_only: bool,
    pub page_size: usize,
    pub page_delay: Duration,
    pub feed_format: FeedFormat,
    pub verify_tls: bool,
    pub parallel_probes: bool,
    pub output_dir: PathBuf,
    pub ingest_command: Option<PathBuf>,
    pub backoff: BackoffPolicy,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            index_url: String::new(),
            datasets_cfg: PathBuf::from("datasets.json"),
            window: TimeWindow::trailing_day_from_now(),
            dataset_version: DEFAULT_DATASET_VERSION.to_string(),
            user: None,
            password: None,
            email_to: Vec::new(),
            browse: false,
            ingest_missing: false,
            create_only: false,
            page_size: PAGE_SIZE,
            page_delay: DEFAULT_PAGE_DELAY,
            feed_format: FeedFormat::Xml,
            verify_tls: false,
            parallel_probes: false,
            output_dir: PathBuf::from("."),
            ingest_command: None,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl ScrapeConfig {
    /// Resolve the downstream action; rejects conflicting flags
    pub fn action(&self) -> ScrapeResult<Action> {
        Action::from_flags(self.ingest_missing, self.create_only)
    }

    /// Basic-auth credentials, only when both parts are present
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.as_str())),
            _ => None,
        }
    }

    /// Check everything that can be checked before touching the network
    pub fn validate(&self) -> ScrapeResult<Action> {
        let action = self.action()?;

        if self.index_url.is_empty() {
            return Err(ScrapeError::Config("Index URL must not be empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(ScrapeError::Config("Page size must be positive".to_string()));
        }
        Ok(action)
    }
}
