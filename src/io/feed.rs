//! Decoding of catalog result pages (OpenSearch JSON and Atom XML) into [`Feed`]

use crate::config::FeedFormat;
use crate::types::{Feed, Link, RawEntry, ScrapeError, ScrapeResult, TypedField};
use quick_xml::de::from_str;
use serde::Deserialize;

/// Decode a response body in the requested format
pub fn decode_feed(format: FeedFormat, body: &str) -> ScrapeResult<Feed> {
    match format {
        FeedFormat::Json => decode_json(body),
        FeedFormat::Xml => decode_xml(body),
    }
}

/// A value that is sent as a lone object when there is only one of it
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

fn flatten<T>(value: Option<OneOrMany<T>>) -> Vec<T> {
    value.map(OneOrMany::into_vec).unwrap_or_default()
}

/// Field content; the catalog mixes quoted and bare numbers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Integer(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JsonResponse {
    feed: JsonFeed,
}

#[derive(Debug, Deserialize)]
struct JsonFeed {
    #[serde(rename = "opensearch:totalResults", default)]
    total_results: Option<Scalar>,
    #[serde(default)]
    entry: Option<OneOrMany<JsonEntry>>,
}

#[derive(Debug, Deserialize)]
struct JsonEntry {
    title: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(rename = "int", default)]
    ints: Option<OneOrMany<JsonField>>,
    #[serde(rename = "str", default)]
    strs: Option<OneOrMany<JsonField>>,
    #[serde(rename = "date", default)]
    dates: Option<OneOrMany<JsonField>>,
    #[serde(rename = "link", default)]
    links: Option<OneOrMany<Link>>,
}

#[derive(Debug, Deserialize)]
struct JsonField {
    name: String,
    content: Scalar,
}

impl From<JsonField> for TypedField {
    fn from(field: JsonField) -> Self {
        TypedField::new(field.name, field.content.into_string())
    }
}

impl From<JsonEntry> for RawEntry {
    fn from(entry: JsonEntry) -> Self {
        RawEntry {
            title: entry.title,
            id: entry.id,
            summary: entry.summary,
            ints: flatten(entry.ints).into_iter().map(TypedField::from).collect(),
            strs: flatten(entry.strs).into_iter().map(TypedField::from).collect(),
            dates: flatten(entry.dates).into_iter().map(TypedField::from).collect(),
            links: flatten(entry.links),
        }
    }
}

/// Decode an OpenSearch JSON page
pub fn decode_json(body: &str) -> ScrapeResult<Feed> {
    let response: JsonResponse = serde_json::from_str(body)?;
    let total_results = match response.feed.total_results {
        Some(total) => Some(parse_total(&total.into_string())?),
        None => None,
    };

    Ok(Feed {
        total_results,
        entries: flatten(response.feed.entry)
            .into_iter()
            .map(RawEntry::from)
            .collect(),
    })
}

fn parse_total(value: &str) -> ScrapeResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ScrapeError::XmlParsing(format!("Invalid opensearch:totalResults '{}': {}", value, e)))
}

/// Atom `<feed>` root
#[derive(Debug, Deserialize)]
struct XmlFeed {
    #[serde(rename = "totalResults", alias = "opensearch:totalResults", default)]
    total_results: Option<String>,
    #[serde(rename = "entry", default)]
    entries: Vec<XmlEntry>,
}

#[derive(Debug, Deserialize)]
struct XmlEntry {
    title: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<XmlLink>,
    #[serde(rename = "int", default)]
    ints: Vec<XmlField>,
    #[serde(rename = "str", default)]
    strs: Vec<XmlField>,
    #[serde(rename = "date", default)]
    dates: Vec<XmlField>,
}

#[derive(Debug, Deserialize)]
struct XmlLink {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@rel", default)]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlField {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "$text", default)]
    content: String,
}

impl From<XmlField> for TypedField {
    fn from(field: XmlField) -> Self {
        TypedField::new(field.name, field.content)
    }
}

impl From<XmlEntry> for RawEntry {
    fn from(entry: XmlEntry) -> Self {
        RawEntry {
            title: entry.title,
            id: entry.id,
            summary: entry.summary,
            ints: entry.ints.into_iter().map(TypedField::from).collect(),
            strs: entry.strs.into_iter().map(TypedField::from).collect(),
            dates: entry.dates.into_iter().map(TypedField::from).collect(),
            links: entry
                .links
                .into_iter()
                .map(|l| Link { href: l.href, rel: l.rel })
                .collect(),
        }
    }
}

/// Decode an Atom XML page
pub fn decode_xml(body: &str) -> ScrapeResult<Feed> {
    let feed = from_str::<XmlFeed>(body)
        .map_err(|e| ScrapeError::XmlParsing(format!("Failed to parse catalog feed: {}", e)))?;

    let total_results = match feed.total_results {
        Some(total) => Some(parse_total(&total)?),
        None => None,
    };

    Ok(Feed {
        total_results,
        entries: feed.entries.into_iter().map(RawEntry::from).collect(),
    })
}
