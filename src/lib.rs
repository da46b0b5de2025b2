//! opdsfeed - OPDS 2.0 feeds for Springer e-books
//!
//! Collects e-book metadata from the Springer Nature book metadata API and
//! KBART holdings files, keeps it in a SQLite store, and exports the
//! holdings as a paginated OPDS 2.0 JSON feed.
//!
//! # Architecture
//!
//! Export is a single sequential pass:
//! - The store yields books one at a time, in `book_id` order
//! - Each book is mapped to an OPDS publication
//! - Publications are grouped into fixed-size pages with navigation links
//! - Each finished page is handed to a sink
//!
//! # Modules
//!
//! - `catalog`: Springer API client and record types
//! - `holdings`: KBART holdings reader
//! - `ingest`: Catalog and holdings → store
//! - `store`: SQLite-backed book store
//! - `feed`: OPDS mapping, pagination and output
//! - `domain`: Data structures (Book, Subject, Link)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Add books published in the last week and rebuild the feed
//! opdsfeed update 7
//!
//! # Add the titles of a KBART holdings file
//! opdsfeed ingest holdings.txt
//!
//! # Rebuild the feed only
//! opdsfeed generate
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod domain;
pub mod feed;
pub mod holdings;
pub mod ingest;
pub mod store;

// Re-export main types at crate root for convenience
pub use catalog::{CatalogError, CatalogSource, SpringerClient};
pub use domain::{Book, Link, LinkFormat, Subject};
pub use feed::{generate_feed, FeedOptions, FeedPage, FeedSink, FeedSummary, FileSink};
pub use ingest::{IngestReport, Ingestor};
pub use store::BookStore;
