//! Springer Nature book metadata API.
//!
//! The ingestor talks to the catalog through [`CatalogSource`] so it can
//! be driven by the HTTP client or by a fixture.

pub mod client;
pub mod pager;
pub mod record;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

pub use client::SpringerClient;
pub use pager::RecordPager;
pub use record::{BookMetadata, CatalogRecord, RecordPage, ResultSummary};

/// Errors raised by catalog lookups
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("No catalog record found for {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode catalog response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CatalogError {
    /// Whether the lookup simply matched nothing
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound(_))
    }
}

/// Source of catalog records
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Look up a single record by DOI (with or without the `doi:` prefix)
    async fn fetch_by_identifier(&self, id: &str) -> Result<CatalogRecord, CatalogError>;

    /// Fetch one upstream page of a query; `start` is 1-based
    async fn fetch_page(&self, query: &str, start: usize) -> Result<RecordPage, CatalogError>;

    /// Records published online on or after `since`, fetched page by page
    fn fetch_since(&self, since: NaiveDate) -> RecordPager<'_, Self>
    where
        Self: Sized,
    {
        RecordPager::new(self, since_query(since))
    }
}

/// Query selecting records published online on or after a date
pub fn since_query(since: NaiveDate) -> String {
    format!("onlinedatefrom:{}", since.format("%Y-%m-%d"))
}

/// Add the `doi:` prefix the API expects, unless already present
pub fn normalize_doi(id: &str) -> String {
    if id.starts_with("doi") {
        id.to_string()
    } else {
        format!("doi:{}", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_doi() {
        assert_eq!(
            normalize_doi("10.1007/978-1-349-11550-1"),
            "doi:10.1007/978-1-349-11550-1"
        );
        assert_eq!(
            normalize_doi("doi:10.1007/978-1-349-11550-1"),
            "doi:10.1007/978-1-349-11550-1"
        );
    }

    #[test]
    fn test_since_query() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(since_query(date), "onlinedatefrom:2024-03-07");
    }

    #[test]
    fn test_not_found_kind() {
        assert!(CatalogError::NotFound("x".into()).is_not_found());
        assert!(!CatalogError::Status {
            status: 500,
            body: String::new()
        }
        .is_not_found());
    }
}
