//! I/O modules for talking to the catalog, the index and the filesystem

pub mod feed;
pub mod retry;
pub mod catalog;
pub mod index;
pub mod dataset;
pub mod ingest;

pub use catalog::ApiHubClient;
pub use index::IndexClient;
pub use dataset::{create_acquisition_dataset, read_met_file, BrowseRenderer, ImageBrowse};
pub use ingest::{CommandIngestor, Ingestor};
