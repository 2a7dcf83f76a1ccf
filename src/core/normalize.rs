//! Reshaping of catalog entries into acquisition metadata
//!
//! Each typed field group (`int`, `str`, `date`, `link`) is flattened into one
//! attribute map through a small table of per-field rules. Derived fields
//! (product name, archive name, geometry, platform) are set afterwards and the
//! platform's track/orbit relation is verified last.

use crate::types::{AcquisitionMetadata, Direction, NormalizationError, RawEntry};
use geo::BoundingRect;
use geo_types::Geometry;
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use wkt::TryFromWkt;

/// Prefix of every dataset identifier
pub const PRODUCT_PREFIX: &str = "acquisition-";

/// Sentinel-1 repeat cycle in orbits
pub const REPEAT_CYCLE: i64 = 175;

lazy_static! {
    static ref PLATFORM_RE: Regex = Regex::new(r"S1(.+?)_").unwrap();
}

/// How a source value is turned into the stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Verbatim,
    /// `ASCENDING`/`DESCENDING` to `asc`/`dsc`
    OrbitDirection,
    /// Drop the trailing `Z` zone marker
    StripZone,
}

impl Transform {
    pub fn apply(&self, value: &str) -> Result<String, NormalizationError> {
        match self {
            Transform::Verbatim => Ok(value.to_string()),
            Transform::OrbitDirection => Ok(Direction::from_orbit_direction(value)?.to_string()),
            Transform::StripZone => Ok(value.trim_end_matches('Z').to_string()),
        }
    }
}

/// Source field name to target attribute name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub source: &'static str,
    pub target: &'static str,
    pub transform: Transform,
}

const fn rule(source: &'static str, target: &'static str, transform: Transform) -> FieldRule {
    FieldRule { source, target, transform }
}

pub const INT_RULES: &[FieldRule] = &[
    rule("orbitnumber", "orbitNumber", Transform::Verbatim),
    rule("relativeorbitnumber", "trackNumber", Transform::Verbatim),
];

pub const STR_RULES: &[FieldRule] = &[
    rule("orbitdirection", "direction", Transform::OrbitDirection),
    rule("endposition", "sensingStop", Transform::Verbatim),
];

pub const DATE_RULES: &[FieldRule] = &[
    rule("beginposition", "sensingStart", Transform::StripZone),
    rule("endposition", "sensingStop", Transform::StripZone),
];

/// Attributes that are always derived and never taken from the catalog
const DERIVED_KEYS: &[&str] = &[
    "title",
    "data_product_name",
    "archive_filename",
    "location",
    "bbox",
    "platform",
];

/// Resolve the target name and transform for a source field; unlisted fields pass through
pub fn resolve<'a>(rules: &[FieldRule], source: &'a str) -> (&'a str, Transform) {
    match rules.iter().find(|r| r.source == source) {
        Some(r) => (r.target, r.transform),
        None => (source, Transform::Verbatim),
    }
}

/// Catalog entry to acquisition metadata
pub struct Normalizer;

impl Normalizer {
    /// Normalize one entry; any malformed or inconsistent field is an error
    pub fn normalize(entry: &RawEntry) -> Result<AcquisitionMetadata, NormalizationError> {
        let mut attrs = Map::new();
        if let Some(ref id) = entry.id {
            attrs.insert("id".to_string(), Value::String(id.clone()));
        }
        if let Some(ref summary) = entry.summary {
            attrs.insert("summary".to_string(), Value::String(summary.clone()));
        }

        for field in &entry.ints {
            let (target, _) = resolve(INT_RULES, &field.name);
            let value = field.content.trim().parse::<i64>().map_err(|_| {
                NormalizationError::InvalidInteger {
                    name: field.name.clone(),
                    value: field.content.clone(),
                }
            })?;
            attrs.insert(target.to_string(), Value::from(value));
        }

        for link in &entry.links {
            let key = link.rel.as_deref().unwrap_or("download_url");
            attrs.insert(key.to_string(), Value::String(link.href.clone()));
        }

        for field in &entry.strs {
            let (target, transform) = resolve(STR_RULES, &field.name);
            attrs.insert(target.to_string(), Value::String(transform.apply(&field.content)?));
        }

        for field in &entry.dates {
            let (target, transform) = resolve(DATE_RULES, &field.name);
            attrs.insert(target.to_string(), Value::String(transform.apply(&field.content)?));
        }

        for key in DERIVED_KEYS {
            attrs.remove(*key);
        }

        let title = entry.title.clone();
        let footprint: String = take(&mut attrs, "footprint")?;
        let geometry = parse_footprint(&footprint)?;
        let bbox = envelope_ring(&geometry)
            .ok_or_else(|| NormalizationError::EmptyEnvelope(footprint.clone()))?;
        let platform = extract_platform(&title)?;

        let met = AcquisitionMetadata {
            data_product_name: format!("{}{}", PRODUCT_PREFIX, title),
            archive_filename: format!("{}.zip", title),
            orbit_number: take(&mut attrs, "orbitNumber")?,
            track_number: take(&mut attrs, "trackNumber")?,
            direction: take(&mut attrs, "direction")?,
            sensing_start: take(&mut attrs, "sensingStart")?,
            sensing_stop: take(&mut attrs, "sensingStop")?,
            location: geojson::Geometry::new(geojson::Value::from(&geometry)),
            bbox,
            download_url: take_optional(&mut attrs, "download_url")?,
            platform,
            footprint,
            title,
            attributes: attrs.into_iter().collect(),
        };

        verify_track(&met.platform, met.orbit_number, met.track_number)?;

        Ok(met)
    }
}

fn take<T: DeserializeOwned>(attrs: &mut Map<String, Value>, key: &str) -> Result<T, NormalizationError> {
    take_optional(attrs, key)?.ok_or_else(|| NormalizationError::MissingField(key.to_string()))
}

fn take_optional<T: DeserializeOwned>(
    attrs: &mut Map<String, Value>,
    key: &str,
) -> Result<Option<T>, NormalizationError> {
    match attrs.remove(key) {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| NormalizationError::InvalidField {
                name: key.to_string(),
                detail: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// Parse a WKT footprint into a geometry
pub fn parse_footprint(footprint: &str) -> Result<Geometry<f64>, NormalizationError> {
    Geometry::<f64>::try_from_wkt_str(footprint)
        .map_err(|e| NormalizationError::Footprint(format!("{} ({})", footprint, e)))
}

/// Closed corner ring of the geometry's bounding envelope
pub fn envelope_ring(geometry: &Geometry<f64>) -> Option<Vec<[f64; 2]>> {
    let rect = geometry.bounding_rect()?;
    let (min, max) = (rect.min(), rect.max());
    Some(vec![
        [min.x, min.y],
        [max.x, min.y],
        [max.x, max.y],
        [min.x, max.y],
        [min.x, min.y],
    ])
}

/// `Sentinel-1` plus the token between `S1` and the next `_` of the title
pub fn extract_platform(title: &str) -> Result<String, NormalizationError> {
    PLATFORM_RE
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| format!("Sentinel-1{}", m.as_str()))
        .ok_or_else(|| NormalizationError::PlatformExtraction(title.to_string()))
}

/// Track number implied by an absolute orbit, for platforms with a known phase
pub fn expected_track(platform: &str, orbit_number: i64) -> Option<i64> {
    let offset = match platform {
        "Sentinel-1A" => 73,
        "Sentinel-1B" => 27,
        _ => return None,
    };
    Some((orbit_number - offset).rem_euclid(REPEAT_CYCLE) + 1)
}

/// Check the track/orbit relation; other platforms are not checked
pub fn verify_track(platform: &str, orbit_number: i64, track_number: i64) -> Result<(), NormalizationError> {
    match expected_track(platform, orbit_number) {
        Some(expected) if expected != track_number => Err(NormalizationError::TrackMismatch {
            platform: platform.to_string(),
            orbit: orbit_number,
            track: track_number,
            expected,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Link, TypedField};
    use approx::assert_relative_eq;

    const S1A_TITLE: &str = "S1A_IW_SLC__1SDV_20200103T170815_20200103T170842_030639_0382D5_DADE";

    fn s1a_entry() -> RawEntry {
        RawEntry {
            title: S1A_TITLE.to_string(),
            id: Some("0b1d6f2c".to_string()),
            summary: None,
            ints: vec![
                TypedField::new("orbitnumber", "30639"),
                TypedField::new("relativeorbitnumber", "117"),
                TypedField::new("slicenumber", "5"),
            ],
            strs: vec![
                TypedField::new("orbitdirection", "ASCENDING"),
                TypedField::new("producttype", "SLC"),
                TypedField::new("endposition", "string-form-stop"),
                TypedField::new(
                    "footprint",
                    "POLYGON ((-118.3 34.1, -115.4 34.5, -115.1 36.2, -118.0 35.8, -118.3 34.1))",
                ),
            ],
            dates: vec![
                TypedField::new("beginposition", "2020-01-03T17:08:15.123Z"),
                TypedField::new("endposition", "2020-01-03T17:08:42.456Z"),
                TypedField::new("ingestiondate", "2020-01-03T19:00:00.000Z"),
            ],
            links: vec![
                Link { href: "https://hub.test/Products('0b1d6f2c')/$value".to_string(), rel: None },
                Link { href: "https://hub.test/icon.jpg".to_string(), rel: Some("icon".to_string()) },
            ],
        }
    }

    #[test]
    fn test_normalize_valid_s1a_entry() {
        let met = Normalizer::normalize(&s1a_entry()).unwrap();

        assert_eq!(met.identifier(), format!("acquisition-{}", S1A_TITLE));
        assert_eq!(met.archive_filename, format!("{}.zip", S1A_TITLE));
        assert_eq!(met.orbit_number, 30639);
        assert_eq!(met.track_number, 117);
        assert_eq!(met.direction, Direction::Asc);
        assert_eq!(met.platform, "Sentinel-1A");
        assert_eq!(met.sensing_start, "2020-01-03T17:08:15.123");
        // date group wins over the string-form end position
        assert_eq!(met.sensing_stop, "2020-01-03T17:08:42.456");
        assert_eq!(met.download_url.as_deref(), Some("https://hub.test/Products('0b1d6f2c')/$value"));
        assert_eq!(met.link("icon"), Some("https://hub.test/icon.jpg"));

        // pass-through attributes keep their names and types
        assert_eq!(met.attributes["slicenumber"], Value::from(5));
        assert_eq!(met.attributes["producttype"], Value::from("SLC"));
        assert_eq!(met.attributes["ingestiondate"], Value::from("2020-01-03T19:00:00.000Z"));
        assert_eq!(met.attributes["id"], Value::from("0b1d6f2c"));
        assert!(!met.attributes.contains_key("orbitnumber"));
        assert!(!met.attributes.contains_key("beginposition"));
    }

    #[test]
    fn test_bbox_is_envelope_ring() {
        let met = Normalizer::normalize(&s1a_entry()).unwrap();
        let expected = [
            [-118.3, 34.1],
            [-115.1, 34.1],
            [-115.1, 36.2],
            [-118.3, 36.2],
            [-118.3, 34.1],
        ];
        assert_eq!(met.bbox.len(), expected.len());
        for (got, want) in met.bbox.iter().zip(expected.iter()) {
            assert_relative_eq!(got[0], want[0]);
            assert_relative_eq!(got[1], want[1]);
        }

        match &met.location.value {
            geojson::Value::Polygon(rings) => assert_eq!(rings[0].len(), 5),
            other => panic!("Expected polygon location, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let entry = s1a_entry();
        let first = Normalizer::normalize(&entry).unwrap();
        let second = Normalizer::normalize(&entry).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_direction_is_fatal() {
        let mut entry = s1a_entry();
        entry.strs[0].content = "LEFT".to_string();
        assert_eq!(
            Normalizer::normalize(&entry),
            Err(NormalizationError::UnknownDirection("LEFT".to_string()))
        );
    }

    #[test]
    fn test_track_mismatch_is_fatal() {
        let mut entry = s1a_entry();
        entry.ints[1].content = "118".to_string();
        match Normalizer::normalize(&entry) {
            Err(NormalizationError::TrackMismatch { expected, track, .. }) => {
                assert_eq!(expected, 117);
                assert_eq!(track, 118);
            }
            other => panic!("Expected track mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_platform_token() {
        let mut entry = s1a_entry();
        entry.title = "ENVISAT_ASAR_20020101".to_string();
        assert!(matches!(
            Normalizer::normalize(&entry),
            Err(NormalizationError::PlatformExtraction(_))
        ));
    }

    #[test]
    fn test_bad_integer_and_bad_footprint() {
        let mut entry = s1a_entry();
        entry.ints[0].content = "thirty".to_string();
        assert!(matches!(
            Normalizer::normalize(&entry),
            Err(NormalizationError::InvalidInteger { .. })
        ));

        let mut entry = s1a_entry();
        entry.strs[3].content = "POLYGON ((1 2, 3".to_string();
        assert!(matches!(
            Normalizer::normalize(&entry),
            Err(NormalizationError::Footprint(_))
        ));
    }

    #[test]
    fn test_missing_required_field() {
        let mut entry = s1a_entry();
        entry.dates.remove(0);
        assert_eq!(
            Normalizer::normalize(&entry),
            Err(NormalizationError::MissingField("sensingStart".to_string()))
        );
    }

    #[test]
    fn test_rule_tables() {
        assert_eq!(resolve(INT_RULES, "orbitnumber"), ("orbitNumber", Transform::Verbatim));
        assert_eq!(resolve(INT_RULES, "slicenumber"), ("slicenumber", Transform::Verbatim));
        assert_eq!(resolve(STR_RULES, "orbitdirection"), ("direction", Transform::OrbitDirection));
        assert_eq!(resolve(DATE_RULES, "endposition"), ("sensingStop", Transform::StripZone));

        assert_eq!(Transform::StripZone.apply("2020-01-03T17:08:15Z").unwrap(), "2020-01-03T17:08:15");
        assert_eq!(Transform::OrbitDirection.apply("DESCENDING").unwrap(), "dsc");
    }

    #[test]
    fn test_platform_extraction() {
        assert_eq!(extract_platform(S1A_TITLE).unwrap(), "Sentinel-1A");
        assert_eq!(
            extract_platform("S1B_IW_SLC__1SDV_20200103T050912").unwrap(),
            "Sentinel-1B"
        );
        assert_eq!(
            extract_platform("S1C_IW_SLC__1SDV_20250103T050912").unwrap(),
            "Sentinel-1C"
        );
        assert!(extract_platform("S1").is_err());
    }

    #[test]
    fn test_track_formula() {
        assert_eq!(expected_track("Sentinel-1A", 30639), Some(117));
        assert_eq!(expected_track("Sentinel-1B", 19633), Some(7));
        // cycle boundaries
        assert_eq!(expected_track("Sentinel-1A", 73), Some(1));
        assert_eq!(expected_track("Sentinel-1A", 72), Some(175));
        assert_eq!(expected_track("Sentinel-1B", 27 + 175), Some(1));
        assert_eq!(expected_track("Sentinel-1C", 1000), None);

        // unchecked platforms accept any track
        assert!(verify_track("Sentinel-1C", 1000, 3).is_ok());
        assert!(verify_track("Sentinel-1B", 19633, 8).is_err());
    }
}
