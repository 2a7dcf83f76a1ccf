//! Hand-off of created datasets to an external ingestion step

use crate::io::dataset::{create_acquisition_dataset, BrowseRenderer};
use crate::types::{AcquisitionProduct, ScrapeError, ScrapeResult};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Takes ownership of indexing and queuing one dataset directory
pub trait Ingestor {
    fn ingest(&self, identifier: &str, dataset_dir: &Path, datasets_cfg: &Path) -> ScrapeResult<()>;
}

/// Runs `<program> [args..] <identifier> <dataset_dir> <datasets_cfg>`
#[derive(Debug, Clone)]
pub struct CommandIngestor {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandIngestor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Leading arguments placed before the per-dataset ones
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl Ingestor for CommandIngestor {
    fn ingest(&self, identifier: &str, dataset_dir: &Path, datasets_cfg: &Path) -> ScrapeResult<()> {
        log::info!("Ingesting {} with {}", identifier, self.program.display());

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(identifier)
            .arg(dataset_dir)
            .arg(datasets_cfg)
            .output()
            .map_err(|e| {
                ScrapeError::Ingest(format!("Failed to run {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::error!("Ingest of {} failed:\n{}", identifier, stderr);
            return Err(ScrapeError::Ingest(format!(
                "{} exited with {} for {}",
                self.program.display(),
                output.status,
                identifier
            )));
        }
        Ok(())
    }
}

/// Create the dataset in a scratch directory and hand it to `ingestor`;
/// the scratch directory is removed afterwards whether or not ingestion succeeded
pub fn ingest_acquisition_dataset(
    product: &AcquisitionProduct,
    datasets_cfg: &Path,
    ingestor: &dyn Ingestor,
    browse: Option<&dyn BrowseRenderer>,
) -> ScrapeResult<String> {
    let scratch = tempfile::tempdir()?;
    let (id, ds_dir) =
        create_acquisition_dataset(&product.dataset, &product.met, scratch.path(), browse)?;
    ingestor.ingest(&id, &ds_dir, datasets_cfg)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_command_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("datasets.json");

        assert!(CommandIngestor::new("true").ingest("acquisition-X", dir.path(), &cfg).is_ok());

        match CommandIngestor::new("false").ingest("acquisition-X", dir.path(), &cfg) {
            Err(ScrapeError::Ingest(msg)) => assert!(msg.contains("acquisition-X")),
            other => panic!("Expected ingest error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_command_receives_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("args.txt");
        let script = format!("echo \"$@\" > {}", log.display());

        let ingestor = CommandIngestor::new("sh").with_args(["-c", script.as_str(), "ingest"]);
        ingestor
            .ingest("acquisition-Y", Path::new("/data/acquisition-Y"), Path::new("/etc/datasets.json"))
            .unwrap();

        let args = std::fs::read_to_string(&log).unwrap();
        assert_eq!(args.trim(), "acquisition-Y /data/acquisition-Y /etc/datasets.json");
    }

    #[test]
    fn test_missing_program() {
        let result = CommandIngestor::new("/nonexistent/ingest-program").ingest(
            "acquisition-Z",
            Path::new("."),
            Path::new("datasets.json"),
        );
        assert!(matches!(result, Err(ScrapeError::Ingest(_))));
    }
}
