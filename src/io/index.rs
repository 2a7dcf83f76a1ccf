//! Existence checks against the dataset index over HTTP

use crate::config::BackoffPolicy;
use crate::core::reconcile::{ExistenceProbe, ProbeOutcome};
use crate::io::retry::with_backoff;
use crate::types::ScrapeResult;
use std::time::Duration;

/// HEAD `<base_url>/<identifier>`: 200 exists, 404 missing, anything else is an error
pub struct IndexClient {
    client: reqwest::blocking::Client,
    base_url: String,
    backoff: BackoffPolicy,
}

impl IndexClient {
    pub fn new(base_url: &str, backoff: BackoffPolicy) -> ScrapeResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            backoff,
        })
    }

    pub fn url_for(&self, identifier: &str) -> String {
        format!("{}/{}", self.base_url, identifier)
    }
}

impl ExistenceProbe for IndexClient {
    fn exists(&self, identifier: &str) -> ProbeOutcome {
        let url = self.url_for(identifier);
        let what = format!("HEAD {}", url);

        match with_backoff(&self.backoff, &what, || self.client.head(&url).send()) {
            Ok(response) => match response.status().as_u16() {
                200 => ProbeOutcome::Exists,
                404 => ProbeOutcome::NotExists,
                other => ProbeOutcome::Error(format!("HTTP {} from {}", other, url)),
            },
            Err(e) => ProbeOutcome::Error(format!("{} failed: {}", what, e)),
        }
    }
}
