//! Query ApiHub (OData) for Sentinel-1 IW SLC acquisitions and reconcile
//! them against a dataset index

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use s1scrape::config::{
    parse_iso8601, TimeWindow, DEFAULT_CATALOG_URL, DEFAULT_DATASET_VERSION, PAGE_SIZE,
};
use s1scrape::core::pipeline::{scrape, Collaborators};
use s1scrape::io::{ApiHubClient, BrowseRenderer, CommandIngestor, ImageBrowse, IndexClient, Ingestor};
use s1scrape::{FeedFormat, ScrapeConfig};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

const ERROR_FILE: &str = "_alt_error.txt";
const TRACEBACK_FILE: &str = "_alt_traceback.txt";

#[derive(Parser, Debug)]
#[command(name = "scrape-apihub-odata")]
#[command(about = "Query ApiHub (OData) for S1 SLC scenes and reconcile them against a dataset index")]
#[command(version)]
struct Cli {
    /// Index base URL; a scene exists when <ds_es_url>/<id> answers 200
    ds_es_url: String,

    /// Datasets configuration passed to the ingest step
    datasets_cfg: PathBuf,

    /// Start of the ingestion-date window (ISO 8601); defaults to 24 hours ago
    starttime: Option<String>,

    /// End of the ingestion-date window (ISO 8601); defaults to now
    endtime: Option<String>,

    #[arg(long = "dataset_version", default_value = DEFAULT_DATASET_VERSION)]
    dataset_version: String,

    #[arg(long, short = 'u')]
    user: Option<String>,

    #[arg(long, short = 'p')]
    password: Option<String>,

    /// Notification recipients (accepted, not used)
    #[arg(long = "email")]
    email: Vec<String>,

    /// Create browse images
    #[arg(long)]
    browse: bool,

    /// Create and ingest missing datasets
    #[arg(long, conflicts_with = "create_only")]
    ingest: bool,

    /// Only create missing datasets, do not ingest
    #[arg(long = "create_only")]
    create_only: bool,

    /// Request JSON pages instead of Atom XML
    #[arg(long)]
    json: bool,

    #[arg(long, default_value = DEFAULT_CATALOG_URL)]
    catalog_url: String,

    #[arg(long, default_value_t = PAGE_SIZE)]
    page_size: usize,

    /// Pause between page requests
    #[arg(long, default_value_t = 3.0)]
    page_delay_secs: f64,

    /// Probe the index from the rayon pool
    #[arg(long)]
    parallel_probes: bool,

    #[arg(long)]
    verify_tls: bool,

    /// Program run as `<cmd> <id> <dataset_dir> <datasets_cfg>` for each missing scene
    #[arg(long)]
    ingest_command: Option<PathBuf>,

    /// Where create-only mode writes datasets
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

impl Cli {
    fn window(&self) -> Result<TimeWindow> {
        let trailing = TimeWindow::trailing_day_from_now();
        let start = match &self.starttime {
            Some(s) => parse_iso8601(s)?,
            None => trailing.start,
        };
        let end = match &self.endtime {
            Some(s) => parse_iso8601(s)?,
            None => trailing.end,
        };
        Ok(TimeWindow::new(start, end)?)
    }

    fn into_config(self) -> Result<ScrapeConfig> {
        if !self.page_delay_secs.is_finite() || self.page_delay_secs < 0.0 {
            anyhow::bail!("Page delay must be a non-negative number of seconds");
        }
        let window = self.window()?;

        Ok(ScrapeConfig {
            catalog_url: self.catalog_url,
            index_url: self.ds_es_url,
            datasets_cfg: self.datasets_cfg,
            window,
            dataset_version: self.dataset_version,
            user: self.user,
            password: self.password,
            email_to: self.email,
            browse: self.browse,
            ingest_missing: self.ingest,
            create_only: self.create_only,
            page_size: self.page_size,
            page_delay: Duration::from_secs_f64(self.page_delay_secs),
            feed_format: if self.json { FeedFormat::Json } else { FeedFormat::Xml },
            verify_tls: self.verify_tls,
            parallel_probes: self.parallel_probes,
            output_dir: self.output_dir,
            ingest_command: self.ingest_command,
            ..ScrapeConfig::default()
        })
    }
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}: {}/{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                record.level(),
                record.module_path().unwrap_or("-"),
                record.args()
            )
        })
        .init();
}

fn append(path: &str, text: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", text)
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.into_config()?;
    // Conflicting modes must fail before any client is built
    config.validate()?;

    let catalog = ApiHubClient::from_config(&config).context("Failed to build catalog client")?;
    let index = IndexClient::new(&config.index_url, config.backoff)
        .context("Failed to build index client")?;

    let browse = if config.browse {
        Some(ImageBrowse::new(config.credentials(), config.verify_tls, config.backoff)?)
    } else {
        None
    };
    let ingestor = config.ingest_command.as_ref().map(CommandIngestor::new);

    let collaborators = Collaborators {
        browse: browse.as_ref().map(|b| b as &dyn BrowseRenderer),
        ingestor: ingestor.as_ref().map(|i| i as &dyn Ingestor),
    };

    let outcome = scrape(&config, catalog, &index, collaborators)?;
    log::info!(
        "Done: {} products, {} missing, {} created, {} ingested",
        outcome.accumulator.len(),
        outcome.result.missing.len(),
        outcome.created.len(),
        outcome.ingested.len()
    );
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        log::error!("{:#}", e);
        if let Err(io_err) = append(ERROR_FILE, &format!("{:#}", e))
            .and_then(|_| append(TRACEBACK_FILE, &format!("{:?}", e)))
        {
            log::error!("Failed to record error: {}", io_err);
        }
        return Err(e);
    }
    Ok(())
}
