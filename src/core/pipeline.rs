//! One complete scrape: query, reconcile, report, then the selected action

use crate::config::{Action, ScrapeConfig};
use crate::core::query::{CatalogSource, QueryAccumulator, QueryEngine, QueryOptions};
use crate::core::reconcile::{reconcile, reconcile_parallel, ExistenceProbe, ReconciliationResult};
use crate::core::report::AvailabilityReport;
use crate::io::dataset::{create_acquisition_dataset, BrowseRenderer};
use crate::io::ingest::{ingest_acquisition_dataset, Ingestor};
use crate::types::{ScrapeError, ScrapeResult};
use std::path::PathBuf;

impl From<&ScrapeConfig> for QueryOptions {
    fn from(config: &ScrapeConfig) -> Self {
        Self {
            page_size: config.page_size,
            page_delay: config.page_delay,
            format: config.feed_format,
            dataset_version: config.dataset_version.clone(),
        }
    }
}

/// Optional collaborators for the create and ingest actions
#[derive(Default, Clone, Copy)]
pub struct Collaborators<'a> {
    pub browse: Option<&'a dyn BrowseRenderer>,
    pub ingestor: Option<&'a dyn Ingestor>,
}

/// Everything a scrape produced
#[derive(Debug)]
pub struct ScrapeOutcome {
    pub action: Action,
    pub accumulator: QueryAccumulator,
    pub result: ReconciliationResult,
    pub report: String,
    pub requests_issued: usize,
    /// Directories written in create-only mode
    pub created: Vec<PathBuf>,
    /// Identifiers handed to the ingestor
    pub ingested: Vec<String>,
}

fn check_collaborators(
    config: &ScrapeConfig,
    action: Action,
    collaborators: &Collaborators<'_>,
) -> ScrapeResult<()> {
    if config.browse && action != Action::ReportOnly && collaborators.browse.is_none() {
        return Err(ScrapeError::Config(
            "Browse images requested but no browse renderer configured".to_string(),
        ));
    }
    if action == Action::Ingest && collaborators.ingestor.is_none() {
        return Err(ScrapeError::Config(
            "Ingest mode requires an ingest command".to_string(),
        ));
    }
    Ok(())
}

/// Run a scrape end to end
///
/// Configuration is validated before the catalog is contacted, so a
/// rejected configuration never issues a request.
pub fn scrape<S, P>(
    config: &ScrapeConfig,
    source: S,
    probe: &P,
    collaborators: Collaborators<'_>,
) -> ScrapeResult<ScrapeOutcome>
where
    S: CatalogSource,
    P: ExistenceProbe + Sync,
{
    let action = config.validate()?;
    check_collaborators(config, action, &collaborators)?;

    if !config.email_to.is_empty() {
        log::debug!("Email recipients are not notified: {:?}", config.email_to);
    }
    log::info!("Scraping {} ({:?})", config.window, action);

    let mut engine = QueryEngine::new(source, QueryOptions::from(config));
    let accumulator = engine.run(&config.window)?;
    let requests_issued = engine.requests_issued();

    let result = if config.parallel_probes {
        reconcile_parallel(&accumulator, probe)?
    } else {
        reconcile(&accumulator, probe)?
    };

    let report =
        AvailabilityReport::new(&config.window, &config.index_url, &accumulator, &result).render();
    log::info!("\n{}", report);

    let browse = if config.browse { collaborators.browse } else { None };
    let mut created = Vec::new();
    let mut ingested = Vec::new();

    for id in &result.missing {
        let product = match accumulator.get(id) {
            Some(product) => product,
            None => continue,
        };
        match action {
            Action::ReportOnly => break,
            Action::CreateOnly => {
                let (_, ds_dir) = create_acquisition_dataset(
                    &product.dataset,
                    &product.met,
                    &config.output_dir,
                    browse,
                )?;
                log::info!("Created dataset {}", ds_dir.display());
                created.push(ds_dir);
            }
            Action::Ingest => {
                if let Some(ingestor) = collaborators.ingestor {
                    let id =
                        ingest_acquisition_dataset(product, &config.datasets_cfg, ingestor, browse)?;
                    log::info!("Ingested {}", id);
                    ingested.push(id);
                }
            }
        }
    }

    Ok(ScrapeOutcome {
        action,
        accumulator,
        result,
        report,
        requests_issued,
        created,
        ingested,
    })
}
