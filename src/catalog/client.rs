//! HTTP client for the Springer book metadata endpoint.

use async_trait::async_trait;
use tracing::debug;

use super::{normalize_doi, CatalogError, CatalogRecord, CatalogSource, RecordPage};
use crate::config::SpringerSettings;

/// Default JSON endpoint of the book metadata API
pub const DEFAULT_BASE_URL: &str = "https://api.springernature.com/bookmeta/v1/json";

/// Default number of records requested per upstream page
pub const DEFAULT_PAGE_LENGTH: usize = 50;

/// Springer book metadata API client
pub struct SpringerClient {
    /// API key sent with every request
    api_key: String,
    /// Endpoint URL
    base_url: String,
    /// Records per upstream page
    page_length: usize,
    /// HTTP client
    client: reqwest::Client,
}

impl SpringerClient {
    /// Create a client for the default endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            page_length: DEFAULT_PAGE_LENGTH,
            client: reqwest::Client::new(),
        }
    }

    /// Create from resolved settings
    pub fn from_settings(api_key: impl Into<String>, settings: &SpringerSettings) -> Self {
        Self::new(api_key)
            .with_base_url(settings.base_url.clone())
            .with_page_length(settings.page_length)
    }

    /// Point the client at another endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Change the upstream page length
    pub fn with_page_length(mut self, page_length: usize) -> Self {
        self.page_length = page_length.max(1);
        self
    }

    /// Run a query and decode one page
    async fn request(
        &self,
        query: &str,
        start: usize,
        length: usize,
    ) -> Result<RecordPage, CatalogError> {
        debug!(query, start, length, "Requesting catalog page");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query.to_string()),
                ("api_key", self.api_key.clone()),
                ("s", start.to_string()),
                ("p", length.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CatalogSource for SpringerClient {
    async fn fetch_by_identifier(&self, id: &str) -> Result<CatalogRecord, CatalogError> {
        let doi = normalize_doi(id);
        let page = self.request(&doi, 1, 1).await?;

        page.records
            .into_iter()
            .next()
            .ok_or(CatalogError::NotFound(doi))
    }

    async fn fetch_page(&self, query: &str, start: usize) -> Result<RecordPage, CatalogError> {
        self.request(query, start, self.page_length).await
    }
}
