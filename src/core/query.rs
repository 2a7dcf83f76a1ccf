//! Paginated catalog query with duplicate and per-track bookkeeping

use crate::config::{FeedFormat, TimeWindow, DEFAULT_PAGE_DELAY, PAGE_SIZE};
use crate::core::normalize::Normalizer;
use crate::types::{AcquisitionProduct, DatasetDescriptor, Feed, RawEntry, ScrapeResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Parameters of one page request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    #[serde(rename = "$filter")]
    pub filter: String,
    #[serde(rename = "$skip")]
    pub skip: usize,
    #[serde(rename = "$top")]
    pub top: usize,
    #[serde(rename = "$format")]
    pub format: FeedFormat,
}

/// Anything that can serve catalog pages
pub trait CatalogSource {
    fn fetch_page(&mut self, request: &PageRequest) -> ScrapeResult<Feed>;
}

impl<S: CatalogSource + ?Sized> CatalogSource for &mut S {
    fn fetch_page(&mut self, request: &PageRequest) -> ScrapeResult<Feed> {
        (**self).fetch_page(request)
    }
}

/// Products of one scrape, keyed by identifier
#[derive(Debug, Clone, Default)]
pub struct QueryAccumulator {
    products: BTreeMap<String, AcquisitionProduct>,
    ids_by_track: BTreeMap<i64, Vec<String>>,
    total_results_expected: Option<u64>,
}

impl QueryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product; a repeated identifier replaces the earlier product
    pub fn insert(&mut self, product: AcquisitionProduct) -> Option<AcquisitionProduct> {
        let id = product.met.identifier().to_string();
        self.ids_by_track
            .entry(product.met.track_number)
            .or_default()
            .push(id.clone());

        let previous = self.products.insert(id.clone(), product);
        if previous.is_some() {
            log::warn!("Duplicate identifier {} across pages; keeping the later entry", id);
        }
        previous
    }

    pub fn set_total_results_expected(&mut self, total: u64) {
        self.total_results_expected = Some(total);
    }

    /// Total declared by the catalog on the first page
    pub fn total_results_expected(&self) -> Option<u64> {
        self.total_results_expected
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn get(&self, identifier: &str) -> Option<&AcquisitionProduct> {
        self.products.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.products.contains_key(identifier)
    }

    /// Identifiers in sorted order
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.products.keys().map(String::as_str)
    }

    pub fn products(&self) -> impl Iterator<Item = (&str, &AcquisitionProduct)> {
        self.products.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn ids_by_track(&self) -> &BTreeMap<i64, Vec<String>> {
        &self.ids_by_track
    }

    /// Track number to number of identifiers seen (duplicates included)
    pub fn track_counts(&self) -> Vec<(i64, usize)> {
        self.ids_by_track
            .iter()
            .map(|(track, ids)| (*track, ids.len()))
            .collect()
    }
}

/// Query loop settings
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub page_size: usize,
    pub page_delay: Duration,
    pub format: FeedFormat,
    pub dataset_version: String,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            page_delay: DEFAULT_PAGE_DELAY,
            format: FeedFormat::Xml,
            dataset_version: crate::config::DEFAULT_DATASET_VERSION.to_string(),
        }
    }
}

/// Drives the offset cursor over a [`CatalogSource`] until an empty page
pub struct QueryEngine<S: CatalogSource> {
    source: S,
    options: QueryOptions,
    requests_issued: usize,
}

impl<S: CatalogSource> QueryEngine<S> {
    pub fn new(source: S, options: QueryOptions) -> Self {
        Self {
            source,
            options,
            requests_issued: 0,
        }
    }

    /// Number of page requests made so far
    pub fn requests_issued(&self) -> usize {
        self.requests_issued
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Fetch every page of the window and normalize all entries
    ///
    /// The first normalization failure aborts the whole query.
    pub fn run(&mut self, window: &TimeWindow) -> ScrapeResult<QueryAccumulator> {
        let filter = window.odata_filter();
        let mut accumulator = QueryAccumulator::new();
        let mut offset = 0;

        loop {
            if self.requests_issued > 0 && !self.options.page_delay.is_zero() {
                std::thread::sleep(self.options.page_delay);
            }

            let request = PageRequest {
                filter: filter.clone(),
                skip: offset,
                top: self.options.page_size,
                format: self.options.format,
            };
            log::info!(
                "query: {}",
                serde_json::to_string_pretty(&request).unwrap_or_else(|_| format!("{:?}", request))
            );

            let page = self.source.fetch_page(&request)?;
            self.requests_issued += 1;

            if accumulator.total_results_expected().is_none() {
                if let Some(total) = page.total_results {
                    log::info!("Total results expected: {}", total);
                    accumulator.set_total_results_expected(total);
                }
            }

            let count = page.entries.len();
            log::info!("Found: {} results", count);
            if count == 0 {
                break;
            }

            for entry in &page.entries {
                let product = self.build_product(entry, &page.entries)?;
                accumulator.insert(product);
            }
            offset += count;
        }

        log::info!(
            "Query finished after {} requests: {} unique products",
            self.requests_issued,
            accumulator.len()
        );
        Ok(accumulator)
    }

    fn build_product(&self, entry: &RawEntry, page: &[RawEntry]) -> ScrapeResult<AcquisitionProduct> {
        match Normalizer::normalize(entry) {
            Ok(met) => {
                let dataset = DatasetDescriptor::from_metadata(&met, &self.options.dataset_version);
                Ok(AcquisitionProduct { met, dataset })
            }
            Err(e) => {
                log::error!("Failed to massage result: {}", to_pretty_json(entry));
                log::error!("Extracted entries: {}", to_pretty_json(page));
                Err(e.into())
            }
        }
    }
}

fn to_pretty_json<T: Serialize + std::fmt::Debug + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| format!("{:?}", value))
}
