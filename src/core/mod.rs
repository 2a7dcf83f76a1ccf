//! Core scraping modules

pub mod normalize;
pub mod query;
pub mod reconcile;
pub mod report;
pub mod pipeline;

// Re-export main types
pub use normalize::Normalizer;
pub use query::{CatalogSource, PageRequest, QueryAccumulator, QueryEngine, QueryOptions};
pub use reconcile::{reconcile, reconcile_parallel, ExistenceProbe, InMemoryIndex, ProbeOutcome, ReconciliationResult};
pub use report::AvailabilityReport;
pub use pipeline::{scrape, Collaborators, ScrapeOutcome};
