#![allow(dead_code)]

use s1scrape::core::query::{CatalogSource, PageRequest};
use s1scrape::types::{Feed, Link, RawEntry, ScrapeResult, TypedField};
use std::collections::VecDeque;

/// Sentinel-1B entry with a track consistent with its orbit
pub fn s1b_entry(name: &str, orbit: i64) -> RawEntry {
    let track = (orbit - 27).rem_euclid(175) + 1;
    let title = format!("S1B_IW_SLC__1SDV_{}", name);
    RawEntry {
        title: title.clone(),
        id: Some(format!("uuid-{}", name)),
        summary: None,
        ints: vec![
            TypedField::new("orbitnumber", orbit.to_string()),
            TypedField::new("relativeorbitnumber", track.to_string()),
            TypedField::new("slicenumber", "3"),
        ],
        strs: vec![
            TypedField::new("orbitdirection", "DESCENDING"),
            TypedField::new("producttype", "SLC"),
            TypedField::new(
                "footprint",
                "POLYGON ((10.5 45.25, 13.75 45.5, 13.5 47.0, 10.25 46.75, 10.5 45.25))",
            ),
        ],
        dates: vec![
            TypedField::new("beginposition", "2020-01-03T05:09:12.345Z"),
            TypedField::new("endposition", "2020-01-03T05:09:39.678Z"),
        ],
        links: vec![
            Link {
                href: format!("https://hub.test/odata/v1/Products('{}')/$value", name),
                rel: None,
            },
            Link {
                href: format!("https://hub.test/icons/{}.jpg", name),
                rel: Some("icon".to_string()),
            },
        ],
    }
}

pub fn identifier(name: &str) -> String {
    format!("acquisition-S1B_IW_SLC__1SDV_{}", name)
}

/// Pages of the given sizes, each followed by whatever comes next; then empty pages forever
pub fn pages_of(sizes: &[usize]) -> VecDeque<Feed> {
    let total: usize = sizes.iter().sum();
    let mut n = 0;
    sizes
        .iter()
        .map(|&size| {
            let entries = (0..size)
                .map(|_| {
                    n += 1;
                    s1b_entry(&format!("{:05}", n), 19000 + n as i64)
                })
                .collect();
            Feed {
                total_results: Some(total as u64),
                entries,
            }
        })
        .collect()
}

/// Catalog that replays scripted pages and records every request
#[derive(Default)]
pub struct ScriptedCatalog {
    pub pages: VecDeque<Feed>,
    pub requests: Vec<PageRequest>,
}

impl ScriptedCatalog {
    pub fn new(pages: VecDeque<Feed>) -> Self {
        Self {
            pages,
            requests: Vec::new(),
        }
    }
}

impl CatalogSource for ScriptedCatalog {
    fn fetch_page(&mut self, request: &PageRequest) -> ScrapeResult<Feed> {
        self.requests.push(request.clone());
        Ok(self.pages.pop_front().unwrap_or_default())
    }
}
