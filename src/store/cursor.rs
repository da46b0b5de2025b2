//! Forward-only iteration over stored books.

use anyhow::Result;
use tracing::debug;

use super::BookStore;
use crate::domain::Book;

/// Lazy, non-restartable sequence of books in `book_id` order
pub struct BookCursor<'a> {
    store: &'a BookStore,
    ids: std::vec::IntoIter<String>,
}

impl<'a> BookCursor<'a> {
    pub(super) fn new(store: &'a BookStore, ids: Vec<String>) -> Self {
        Self {
            store,
            ids: ids.into_iter(),
        }
    }

    /// Ids not yet visited
    pub fn remaining(&self) -> usize {
        self.ids.len()
    }
}

impl Iterator for BookCursor<'_> {
    type Item = Result<Book>;

    fn next(&mut self) -> Option<Self::Item> {
        for book_id in self.ids.by_ref() {
            match self.store.get_book(&book_id) {
                Ok(Some(book)) => return Some(Ok(book)),
                Ok(None) => {
                    debug!(%book_id, "Book removed after snapshot, skipping");
                }
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
