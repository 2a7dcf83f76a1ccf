//! On-disk dataset artifacts: descriptor, met file and optional browse images
//!
//! Layout for one acquisition:
//!
//! ```text
//! <root>/<id>/
//!     <id>.dataset.json
//!     <id>.met.json
//!     browse.png, browse_small.png   (optional)
//! ```

use crate::config::{BackoffPolicy, QUERY_API};
use crate::io::retry::with_backoff;
use crate::types::{AcquisitionMetadata, DatasetDescriptor, ScrapeError, ScrapeResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const BROWSE_JPG: &str = "browse.jpg";
pub const BROWSE_PNG: &str = "browse.png";
pub const BROWSE_SMALL_PNG: &str = "browse_small.png";
pub const THUMBNAIL_SIZE: u32 = 250;

#[derive(Serialize)]
struct MetFileRef<'a> {
    #[serde(flatten)]
    met: &'a AcquisitionMetadata,
    query_api: &'a str,
}

#[derive(Deserialize)]
struct MetFile {
    #[serde(flatten)]
    met: AcquisitionMetadata,
    query_api: String,
}

/// Produces browse images for a dataset directory
pub trait BrowseRenderer {
    fn render(&self, met: &AcquisitionMetadata, dataset_dir: &Path) -> ScrapeResult<()>;
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Write `value` as 2-space indented JSON with keys sorted at every level
pub fn write_sorted_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> ScrapeResult<()> {
    let sorted = sort_keys(serde_json::to_value(value)?);
    let text = serde_json::to_string_pretty(&sorted)?;
    fs::write(path, text)?;
    Ok(())
}

fn absolute(root_dir: &Path) -> ScrapeResult<PathBuf> {
    if root_dir.is_absolute() {
        Ok(root_dir.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(root_dir))
    }
}

/// Create `<root_dir>/<id>/` with the descriptor and met files, plus browse
/// images when a renderer is given. Returns the identifier and the directory.
pub fn create_acquisition_dataset(
    dataset: &DatasetDescriptor,
    met: &AcquisitionMetadata,
    root_dir: &Path,
    browse: Option<&dyn BrowseRenderer>,
) -> ScrapeResult<(String, PathBuf)> {
    let id = met.identifier().to_string();
    let ds_dir = absolute(root_dir)?.join(&id);
    fs::create_dir_all(&ds_dir)?;

    write_sorted_json(&ds_dir.join(format!("{}.dataset.json", id)), dataset)?;
    write_sorted_json(
        &ds_dir.join(format!("{}.met.json", id)),
        &MetFileRef {
            met,
            query_api: QUERY_API,
        },
    )?;

    if let Some(renderer) = browse {
        renderer.render(met, &ds_dir)?;
    }

    log::debug!("Wrote dataset {} to {}", id, ds_dir.display());
    Ok((id, ds_dir))
}

/// Read a `.met.json` back; returns the metadata and its `query_api` tag
pub fn read_met_file(path: &Path) -> ScrapeResult<(AcquisitionMetadata, String)> {
    let text = fs::read_to_string(path)?;
    let file: MetFile = serde_json::from_str(&text)?;
    Ok((file.met, file.query_api))
}

pub fn read_dataset_file(path: &Path) -> ScrapeResult<DatasetDescriptor> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Convert a downloaded `browse.jpg` into `browse.png` and a thumbnail
/// bounded by 250x250, then remove the jpg
pub fn convert_browse(dataset_dir: &Path) -> ScrapeResult<()> {
    let jpg = dataset_dir.join(BROWSE_JPG);
    let img = image::open(&jpg)
        .map_err(|e| ScrapeError::Browse(format!("Failed to open {}: {}", jpg.display(), e)))?;

    let png = dataset_dir.join(BROWSE_PNG);
    img.save(&png)
        .map_err(|e| ScrapeError::Browse(format!("Failed to write {}: {}", png.display(), e)))?;

    let small = dataset_dir.join(BROWSE_SMALL_PNG);
    img.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE)
        .save(&small)
        .map_err(|e| ScrapeError::Browse(format!("Failed to write {}: {}", small.display(), e)))?;

    fs::remove_file(&jpg)?;
    Ok(())
}

/// Downloads the record's `icon` link and converts it with [`convert_browse`]
pub struct ImageBrowse {
    client: reqwest::blocking::Client,
    credentials: Option<(String, String)>,
    backoff: BackoffPolicy,
}

impl ImageBrowse {
    pub fn new(
        credentials: Option<(&str, &str)>,
        verify_tls: bool,
        backoff: BackoffPolicy,
    ) -> ScrapeResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;

        Ok(Self {
            client,
            credentials: credentials.map(|(u, p)| (u.to_string(), p.to_string())),
            backoff,
        })
    }

    fn download(&self, url: &str, dest: &Path) -> ScrapeResult<()> {
        let response = with_backoff(&self.backoff, "browse download", || {
            let mut builder = self.client.get(url);
            if let Some((ref user, ref password)) = self.credentials {
                builder = builder.basic_auth(user, Some(password));
            }
            builder.send()
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ScrapeError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        let bytes = response.bytes()?;
        fs::write(dest, &bytes)?;
        log::debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(())
    }
}

impl BrowseRenderer for ImageBrowse {
    fn render(&self, met: &AcquisitionMetadata, dataset_dir: &Path) -> ScrapeResult<()> {
        let icon = met.link("icon").ok_or_else(|| {
            ScrapeError::Browse(format!("{} has no icon link", met.identifier()))
        })?;
        self.download(icon, &dataset_dir.join(BROWSE_JPG))?;
        convert_browse(dataset_dir)
    }
}
