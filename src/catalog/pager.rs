//! Record-at-a-time iteration over a paginated query.
//!
//! Upstream pages are fetched only when the buffered records run out, so
//! the caller sees one flat, finite sequence.

use std::collections::VecDeque;

use tracing::debug;

use super::{CatalogError, CatalogRecord, CatalogSource};

/// Lazy, non-restartable record sequence for one query
pub struct RecordPager<'a, S: ?Sized> {
    source: &'a S,
    query: String,
    next_start: usize,
    buffer: VecDeque<CatalogRecord>,
    exhausted: bool,
}

impl<'a, S: CatalogSource + ?Sized> RecordPager<'a, S> {
    pub fn new(source: &'a S, query: String) -> Self {
        Self {
            source,
            query,
            next_start: 1,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// The query being paged
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Next record, fetching another upstream page when needed
    pub async fn next_record(&mut self) -> Result<Option<CatalogRecord>, CatalogError> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Ok(Some(record));
            }
            if self.exhausted {
                return Ok(None);
            }

            let page = self.source.fetch_page(&self.query, self.next_start).await?;
            let fetched = page.records.len();
            let total = page.total();
            debug!(query = %self.query, start = self.next_start, fetched, total, "Fetched catalog page");

            self.next_start += fetched;
            if fetched == 0 || self.next_start > total {
                self.exhausted = true;
            }
            self.buffer.extend(page.records);
        }
    }
}
