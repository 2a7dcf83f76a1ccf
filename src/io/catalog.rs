//! ApiHub OData catalog over HTTP

use crate::config::{BackoffPolicy, ScrapeConfig};
use crate::core::query::{CatalogSource, PageRequest};
use crate::io::feed::decode_feed;
use crate::io::retry::with_backoff;
use crate::types::{Feed, ScrapeError, ScrapeResult};
use std::time::Duration;

/// Blocking client for the products search endpoint
pub struct ApiHubClient {
    client: reqwest::blocking::Client,
    url: String,
    credentials: Option<(String, String)>,
    backoff: BackoffPolicy,
}

impl ApiHubClient {
    pub fn new(
        url: &str,
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
            url: url.to_string(),
            credentials: credentials.map(|(u, p)| (u.to_string(), p.to_string())),
            backoff,
        })
    }

    pub fn from_config(config: &ScrapeConfig) -> ScrapeResult<Self> {
        Self::new(
            &config.catalog_url,
            config.credentials(),
            config.verify_tls,
            config.backoff,
        )
    }

    fn send(&self, request: &PageRequest) -> reqwest::Result<reqwest::blocking::Response> {
        let mut builder = self.client.get(&self.url).query(request);
        if let Some((ref user, ref password)) = self.credentials {
            builder = builder.basic_auth(user, Some(password));
        }
        builder.send()
    }
}

impl CatalogSource for ApiHubClient {
    fn fetch_page(&mut self, request: &PageRequest) -> ScrapeResult<Feed> {
        let response = with_backoff(&self.backoff, "catalog query", || self.send(request))?;
        let url = response.url().to_string();
        log::info!("query_url: {}", url);

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            log::error!("Error: {}\n{}", status.as_u16(), body);
            return Err(ScrapeError::Status {
                status: status.as_u16(),
                url,
                body,
            });
        }

        decode_feed(request.format, &body)
    }
}
