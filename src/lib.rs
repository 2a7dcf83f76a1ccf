//! s1scrape: Sentinel-1 SLC catalog scraper
//!
//! Queries the Copernicus ApiHub OData catalog for IW SLC acquisitions in a
//! time window, normalizes every entry into acquisition metadata, checks each
//! acquisition against a dataset index, and reports, creates or ingests the
//! ones the index is missing.

pub mod types;
pub mod config;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    AcquisitionMetadata, AcquisitionProduct, DatasetDescriptor, Direction, Feed,
    NormalizationError, RawEntry, ScrapeError, ScrapeResult,
};

pub use config::{Action, BackoffPolicy, FeedFormat, ScrapeConfig, TimeWindow};
pub use io::{ApiHubClient, CommandIngestor, ImageBrowse, IndexClient};
pub use crate::core::{scrape, Collaborators, InMemoryIndex, Normalizer, QueryAccumulator, ScrapeOutcome};
