mod common;

use common::{pages_of, s1b_entry, ScriptedCatalog};
use s1scrape::config::{FeedFormat, TimeWindow};
use s1scrape::core::query::{QueryEngine, QueryOptions};
use s1scrape::io::feed::decode_feed;
use s1scrape::types::{Feed, ScrapeError};
use serde_json::json;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

fn window() -> TimeWindow {
    TimeWindow::parse("2020-01-03T00:00:00", "2020-01-04T00:00:00").unwrap()
}

fn no_delay() -> QueryOptions {
    QueryOptions {
        page_delay: Duration::ZERO,
        ..QueryOptions::default()
    }
}

#[test]
fn test_pages_until_empty_page() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut catalog = ScriptedCatalog::new(pages_of(&[100, 100, 37, 0]));
    let mut engine = QueryEngine::new(&mut catalog, no_delay());
    let acc = engine.run(&window()).unwrap();

    assert_eq!(engine.requests_issued(), 4);
    assert_eq!(acc.len(), 237);
    assert_eq!(acc.total_results_expected(), Some(237));

    let skips: Vec<usize> = catalog.requests.iter().map(|r| r.skip).collect();
    assert_eq!(skips, vec![0, 100, 200, 237]);
    assert!(catalog.requests.iter().all(|r| r.top == 100));
    assert!(catalog.requests.iter().all(|r| r.filter.contains("substringof('IW_SLC',Name)")));

    println!("✅ 4 requests, {} products", acc.len());
}

#[test]
fn test_declared_total_does_not_stop_paging() {
    let mut pages = pages_of(&[2, 2]);
    for page in pages.iter_mut() {
        page.total_results = Some(1);
    }
    let mut catalog = ScriptedCatalog::new(pages);
    let mut engine = QueryEngine::new(&mut catalog, no_delay());
    let acc = engine.run(&window()).unwrap();

    assert_eq!(acc.len(), 4);
    assert_eq!(acc.total_results_expected(), Some(1));
    assert_eq!(catalog.requests.len(), 3);
}

#[test]
fn test_single_entry_object_page_matches_list_page() {
    let entry = serde_json::to_value(s1b_entry("LONE", 19633)).unwrap();
    let as_object = json!({"feed": {"opensearch:totalResults": "1", "entry": entry.clone()}});
    let as_list = json!({"feed": {"opensearch:totalResults": "1", "entry": [entry]}});

    let object_page = decode_feed(FeedFormat::Json, &as_object.to_string()).unwrap();
    let list_page = decode_feed(FeedFormat::Json, &as_list.to_string()).unwrap();
    assert_eq!(object_page, list_page);

    let run = |page: Feed| {
        let mut catalog = ScriptedCatalog::new(VecDeque::from(vec![page]));
        QueryEngine::new(&mut catalog, no_delay()).run(&window()).unwrap()
    };
    let from_object = run(object_page);
    let from_list = run(list_page);

    assert_eq!(from_object.len(), 1);
    let a: Vec<_> = from_object.products().collect();
    let b: Vec<_> = from_list.products().collect();
    assert_eq!(a, b);
    assert_eq!(from_object.ids_by_track(), from_list.ids_by_track());
}

#[test]
fn test_bad_entry_aborts_query() {
    let mut pages = pages_of(&[3]);
    pages[0].entries[1].strs[0].content = "SIDEWAYS".to_string();
    let mut catalog = ScriptedCatalog::new(pages);

    let result = QueryEngine::new(&mut catalog, no_delay()).run(&window());
    assert!(matches!(result, Err(ScrapeError::Normalization(_))));
    // no further page is requested after the failure
    assert_eq!(catalog.requests.len(), 1);
}

#[test]
fn test_pause_between_pages() {
    let mut catalog = ScriptedCatalog::new(pages_of(&[1, 1]));
    let options = QueryOptions {
        page_delay: Duration::from_millis(20),
        ..QueryOptions::default()
    };

    let started = Instant::now();
    QueryEngine::new(&mut catalog, options).run(&window()).unwrap();

    // three requests, two pauses
    assert_eq!(catalog.requests.len(), 3);
    assert!(started.elapsed() >= Duration::from_millis(40));
}
