//! OPDS 2.0 feed export.
//!
//! Stored books flow through a single sequential pass:
//! store cursor → mapper → paginator (pages + navigation) → sink.
//! The store is only read.

pub mod mapper;
pub mod navigation;
pub mod opds;
pub mod paginator;
pub mod sink;

use std::num::NonZeroUsize;

use anyhow::{Context, Result};
use tracing::{info, instrument};

pub use mapper::publication;
pub use navigation::{navigation_links, NavSlots, PageAddress, RelValue, Relation};
pub use opds::{FeedPage, Publication, FEED_MEDIA_TYPE};
pub use paginator::{page_count, FeedPaginator};
pub use sink::{FeedSink, FileSink};

use crate::config::FeedSettings;
use crate::store::BookStore;

/// Parameters of one feed export
#[derive(Debug, Clone)]
pub struct FeedOptions {
    pub title: String,
    pub page_size: NonZeroUsize,
    pub address: PageAddress,
}

impl FeedOptions {
    pub fn new(title: impl Into<String>, page_size: NonZeroUsize, address: PageAddress) -> Self {
        Self {
            title: title.into(),
            page_size,
            address,
        }
    }

    /// Options from the resolved feed settings
    pub fn from_settings(settings: &FeedSettings) -> Self {
        Self::new(
            settings.title.clone(),
            settings.page_size,
            PageAddress::new(settings.base_url.clone()),
        )
    }
}

/// Outcome of a feed export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedSummary {
    /// Pages handed to the sink
    pub pages: usize,
    /// Publications across those pages
    pub publications: usize,
}

/// Export every stored book as a paginated feed
#[instrument(skip_all, fields(page_size = options.page_size.get()))]
pub async fn generate_feed<S>(
    store: &BookStore,
    sink: &S,
    options: &FeedOptions,
) -> Result<FeedSummary>
where
    S: FeedSink + ?Sized,
{
    let total = store.count_books()?;
    let books = store.books()?;
    let paginator = FeedPaginator::new(
        books,
        total,
        options.page_size,
        options.title.clone(),
        options.address.clone(),
    );
    info!(books = total, pages = paginator.total_pages(), "Generating feed");

    let mut summary = FeedSummary::default();
    for page in paginator {
        let page = page.context("Failed to read books for feed")?;
        let number = page.page_number();
        sink.write_page(number, &page)
            .await
            .with_context(|| format!("Failed to write feed page {}", number))?;

        summary.pages += 1;
        summary.publications += page.publications.len();
        info!(page = number, items = page.publications.len(), "Wrote feed page");
    }

    Ok(summary)
}
