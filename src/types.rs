use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One `{name, content}` pair from an `int`, `str` or `date` group of a catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    pub content: String,
}

impl TypedField {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Entry link; the link without a relation is the product download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
}

/// Catalog entry as received, before normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntry {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(rename = "int", default)]
    pub ints: Vec<TypedField>,
    #[serde(rename = "str", default)]
    pub strs: Vec<TypedField>,
    #[serde(rename = "date", default)]
    pub dates: Vec<TypedField>,
    #[serde(rename = "link", default)]
    pub links: Vec<Link>,
}

/// One decoded result page of the catalog
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
    /// Declared total result count; informational only
    pub total_results: Option<u64>,
    pub entries: Vec<RawEntry>,
}

/// Pass direction of the acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Dsc,
}

impl Direction {
    /// Map the catalog's `orbitdirection` value
    pub fn from_orbit_direction(value: &str) -> Result<Self, NormalizationError> {
        match value {
            "ASCENDING" => Ok(Direction::Asc),
            "DESCENDING" => Ok(Direction::Dsc),
            other => Err(NormalizationError::UnknownDirection(other.to_string())),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Asc => write!(f, "asc"),
            Direction::Dsc => write!(f, "dsc"),
        }
    }
}

/// Normalized acquisition metadata (the `.met.json` content)
///
/// Catalog attributes without a dedicated field are kept verbatim in
/// `attributes` and serialized flat next to the typed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionMetadata {
    pub title: String,
    pub data_product_name: String,
    pub archive_filename: String,
    #[serde(rename = "orbitNumber")]
    pub orbit_number: i64,
    #[serde(rename = "trackNumber")]
    pub track_number: i64,
    pub direction: Direction,
    #[serde(rename = "sensingStart")]
    pub sensing_start: String,
    #[serde(rename = "sensingStop")]
    pub sensing_stop: String,
    pub platform: String,
    pub footprint: String,
    pub location: geojson::Geometry,
    /// Envelope ring of `location`: [minx,miny], [maxx,miny], [maxx,maxy], [minx,maxy], [minx,miny]
    pub bbox: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl AcquisitionMetadata {
    /// Unique dataset identifier (`acquisition-<title>`)
    pub fn identifier(&self) -> &str {
        &self.data_product_name
    }

    /// URL of a named link relation, e.g. `icon`
    pub fn link(&self, rel: &str) -> Option<&str> {
        self.attributes.get(rel).and_then(|v| v.as_str())
    }
}

/// Minimal dataset descriptor (the `.dataset.json` content)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub version: String,
    pub label: String,
    pub location: geojson::Geometry,
    pub starttime: String,
    pub endtime: String,
}

impl DatasetDescriptor {
    pub fn from_metadata(met: &AcquisitionMetadata, version: &str) -> Self {
        Self {
            version: version.to_string(),
            label: met.data_product_name.clone(),
            location: met.location.clone(),
            starttime: met.sensing_start.clone(),
            endtime: met.sensing_stop.clone(),
        }
    }
}

/// Metadata and descriptor kept together per identifier
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionProduct {
    pub met: AcquisitionMetadata,
    pub dataset: DatasetDescriptor,
}

/// Errors raised while reshaping a catalog entry; always fatal to a scrape
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {name}: {detail}")]
    InvalidField { name: String, detail: String },

    #[error("Invalid integer for {name}: {value}")]
    InvalidInteger { name: String, value: String },

    #[error("Failed to recognize orbit direction: {0}")]
    UnknownDirection(String),

    #[error("platform extraction failed: {0}")]
    PlatformExtraction(String),

    #[error("Failed to verify {platform} relative orbit number: track {track} != {expected} for orbit {orbit}")]
    TrackMismatch {
        platform: String,
        orbit: i64,
        track: i64,
        expected: i64,
    },

    #[error("Invalid footprint WKT: {0}")]
    Footprint(String),

    #[error("Footprint has no envelope: {0}")]
    EmptyEnvelope(String),
}

/// Error types for a scrape run
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Normalization error: {0}")]
    Normalization(#[from] NormalizationError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("Index check failed for {identifier}: {detail}")]
    Index { identifier: String, detail: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parsing error: {0}")]
    XmlParsing(String),

    #[error("Ingestion error: {0}")]
    Ingest(String),

    #[error("Browse error: {0}")]
    Browse(String),
}

/// Result type for scrape operations
pub type ScrapeResult<T> = Result<T, ScrapeError>;
