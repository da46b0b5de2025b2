//! Splits an ordered book sequence into feed pages.
//!
//! Books are pulled one at a time, mapped, and buffered until the page is
//! full or the last book is read. At most one page of publications is held
//! in memory.

use std::num::NonZeroUsize;

use anyhow::Result;
use tracing::warn;

use super::mapper;
use super::navigation::{navigation_links, PageAddress};
use super::opds::{FeedMetadata, FeedPage, Publication};
use crate::domain::Book;

/// Number of pages needed for `total` items at `page_size` per page
pub fn page_count(total: usize, page_size: NonZeroUsize) -> usize {
    total.div_ceil(page_size.get())
}

/// Lazy sequence of feed pages over a book sequence
pub struct FeedPaginator<I> {
    books: I,
    total: usize,
    page_size: NonZeroUsize,
    total_pages: usize,
    title: String,
    address: PageAddress,
    read: usize,
    page: usize,
    done: bool,
}

impl<I> FeedPaginator<I>
where
    I: Iterator<Item = Result<Book>>,
{
    /// Paginate `books`, of which there are `total`
    pub fn new(
        books: I,
        total: usize,
        page_size: NonZeroUsize,
        title: impl Into<String>,
        address: PageAddress,
    ) -> Self {
        Self {
            books,
            total,
            page_size,
            total_pages: page_count(total, page_size),
            title: title.into(),
            address,
            read: 0,
            page: 0,
            done: total == 0,
        }
    }

    /// Pages the feed will have, computed from the announced total
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    fn build_page(&mut self, publications: Vec<Publication>) -> FeedPage {
        self.page += 1;
        FeedPage {
            metadata: FeedMetadata {
                title: self.title.clone(),
                items_per_page: publications.len(),
                current_page: self.page,
                number_of_items: self.total,
            },
            links: navigation_links(self.page, self.total_pages, &self.address),
            publications,
        }
    }
}

impl<I> Iterator for FeedPaginator<I>
where
    I: Iterator<Item = Result<Book>>,
{
    type Item = Result<FeedPage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut buffer = Vec::with_capacity(self.page_size.get().min(self.total - self.read));
        while buffer.len() < self.page_size.get() && self.read < self.total {
            match self.books.next() {
                Some(Ok(book)) => {
                    self.read += 1;
                    buffer.push(mapper::publication(&book));
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    warn!(
                        expected = self.total,
                        read = self.read,
                        "Book source ended early, flushing partial page"
                    );
                    self.done = true;
                    break;
                }
            }
        }

        if self.read >= self.total {
            self.done = true;
        }
        if buffer.is_empty() {
            return None;
        }
        Some(Ok(self.build_page(buffer)))
    }
}
